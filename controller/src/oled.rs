//! SSD1306 panel behind the shared [`DisplaySurface`] trait.

use embedded_graphics::{
    mono_font::{
        ascii::{FONT_10X20, FONT_6X10},
        MonoTextStyle, MonoTextStyleBuilder,
    },
    pixelcolor::BinaryColor,
    prelude::*,
    primitives::{PrimitiveStyle, Rectangle},
    text::Text,
};
use log::warn;
use ssd1306::{mode::BufferedGraphicsMode, prelude::*, I2CDisplayInterface, Ssd1306};

use heatmat_common::{DisplaySurface, Font};

type Panel<I2C> =
    Ssd1306<I2CInterface<I2C>, DisplaySize128x64, BufferedGraphicsMode<DisplaySize128x64>>;

pub struct Oled<I2C> {
    panel: Panel<I2C>,
    flush_failed: bool,
}

impl<I2C> Oled<I2C>
where
    I2C: embedded_hal::i2c::I2c,
{
    pub fn init(i2c: I2C) -> anyhow::Result<Self> {
        let interface = I2CDisplayInterface::new(i2c);
        let mut panel = Ssd1306::new(interface, DisplaySize128x64, DisplayRotation::Rotate0)
            .into_buffered_graphics_mode();
        panel
            .init()
            .map_err(|err| anyhow::anyhow!("ssd1306 init failed: {err:?}"))?;
        panel.clear_buffer();
        panel
            .flush()
            .map_err(|err| anyhow::anyhow!("ssd1306 flush failed: {err:?}"))?;

        Ok(Self {
            panel,
            flush_failed: false,
        })
    }
}

fn text_style(font: Font) -> MonoTextStyle<'static, BinaryColor> {
    let builder = MonoTextStyleBuilder::new().text_color(BinaryColor::On);
    match font {
        Font::Small => builder.font(&FONT_6X10).build(),
        Font::Large => builder.font(&FONT_10X20).build(),
    }
}

impl<I2C> DisplaySurface for Oled<I2C>
where
    I2C: embedded_hal::i2c::I2c,
{
    fn clear(&mut self) {
        self.panel.clear_buffer();
    }

    fn draw_text(&mut self, x: i32, y: i32, text: &str, font: Font) {
        let _ = Text::new(text, Point::new(x, y), text_style(font)).draw(&mut self.panel);
    }

    fn fill_rect(&mut self, x: i32, y: i32, width: u32, height: u32) {
        let _ = Rectangle::new(Point::new(x, y), Size::new(width, height))
            .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
            .draw(&mut self.panel);
    }

    fn draw_pixel(&mut self, x: i32, y: i32) {
        let _ = Pixel(Point::new(x, y), BinaryColor::On).draw(&mut self.panel);
    }

    fn flush(&mut self) {
        // Only the first failure is logged; the bus is retried every frame.
        match self.panel.flush() {
            Ok(()) => self.flush_failed = false,
            Err(err) if !self.flush_failed => {
                warn!("ssd1306 flush failed: {err:?}");
                self.flush_failed = true;
            }
            Err(_) => {}
        }
    }
}
