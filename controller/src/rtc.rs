// DS3231 real-time clock over I2C. Registers are BCD; the century bit in the
// month register extends the two-digit year to 2000..=2199.

use core::fmt::Debug;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use embedded_hal::i2c::I2c;

pub const DS3231_ADDRESS: u8 = 0x68;

const REG_SECONDS: u8 = 0x00;
const REG_STATUS: u8 = 0x0F;
const HOUR_12H_MODE: u8 = 0x40;
const HOUR_PM: u8 = 0x20;
const MONTH_CENTURY: u8 = 0x80;
const STATUS_OSCILLATOR_STOPPED: u8 = 0x80;

#[derive(Debug, thiserror::Error)]
pub enum RtcError<E: Debug> {
    #[error("i2c transfer failed: {0:?}")]
    Bus(E),
    #[error("clock registers hold an invalid date")]
    InvalidDate,
    #[error("year {0} is outside the clock's range")]
    YearOutOfRange(i32),
}

pub struct Ds3231<I2C> {
    i2c: I2C,
}

impl<I2C, E> Ds3231<I2C>
where
    I2C: I2c<Error = E>,
    E: Debug,
{
    pub fn new(i2c: I2C) -> Self {
        Self { i2c }
    }

    /// True when the chip acknowledges its address.
    pub fn probe(&mut self) -> bool {
        let mut status = [0_u8; 1];
        self.i2c
            .write_read(DS3231_ADDRESS, &[REG_STATUS], &mut status)
            .is_ok()
    }

    /// The oscillator-stop flag survives until the time is set again, so a
    /// backup battery failure stays visible across reboots.
    pub fn lost_power(&mut self) -> Result<bool, RtcError<E>> {
        Ok(self.read_status()? & STATUS_OSCILLATOR_STOPPED != 0)
    }

    pub fn read_datetime(&mut self) -> Result<NaiveDateTime, RtcError<E>> {
        let mut buf = [0_u8; 7];
        self.i2c
            .write_read(DS3231_ADDRESS, &[REG_SECONDS], &mut buf)
            .map_err(RtcError::Bus)?;

        let second = bcd_decode(buf[0] & 0x7F);
        let minute = bcd_decode(buf[1] & 0x7F);
        let hour = decode_hour(buf[2]);
        let day = bcd_decode(buf[4] & 0x3F);
        let month = bcd_decode(buf[5] & 0x1F);
        let century = if buf[5] & MONTH_CENTURY != 0 { 100 } else { 0 };
        let year = 2000 + century + i32::from(bcd_decode(buf[6]));

        NaiveDate::from_ymd_opt(year, month.into(), day.into())
            .and_then(|date| date.and_hms_opt(hour.into(), minute.into(), second.into()))
            .ok_or(RtcError::InvalidDate)
    }

    /// Writes the time in 24-hour mode and clears the oscillator-stop flag.
    pub fn set_datetime(&mut self, datetime: &NaiveDateTime) -> Result<(), RtcError<E>> {
        let year = datetime.year();
        if !(2000..=2199).contains(&year) {
            return Err(RtcError::YearOutOfRange(year));
        }
        let offset = (year - 2000) as u32;
        let century = if offset >= 100 { MONTH_CENTURY } else { 0 };

        let frame = [
            REG_SECONDS,
            bcd_encode(datetime.second() as u8),
            bcd_encode(datetime.minute() as u8),
            bcd_encode(datetime.hour() as u8),
            datetime.weekday().number_from_monday() as u8,
            bcd_encode(datetime.day() as u8),
            bcd_encode(datetime.month() as u8) | century,
            bcd_encode((offset % 100) as u8),
        ];
        self.i2c
            .write(DS3231_ADDRESS, &frame)
            .map_err(RtcError::Bus)?;

        let status = self.read_status()?;
        self.i2c
            .write(DS3231_ADDRESS, &[REG_STATUS, status & !STATUS_OSCILLATOR_STOPPED])
            .map_err(RtcError::Bus)
    }

    fn read_status(&mut self) -> Result<u8, RtcError<E>> {
        let mut status = [0_u8; 1];
        self.i2c
            .write_read(DS3231_ADDRESS, &[REG_STATUS], &mut status)
            .map_err(RtcError::Bus)?;
        Ok(status[0])
    }
}

fn decode_hour(raw: u8) -> u8 {
    if raw & HOUR_12H_MODE == 0 {
        return bcd_decode(raw & 0x3F);
    }
    let hour = bcd_decode(raw & 0x1F) % 12;
    if raw & HOUR_PM != 0 {
        hour + 12
    } else {
        hour
    }
}

fn bcd_decode(value: u8) -> u8 {
    (value & 0x0F) + ((value >> 4) * 10)
}

fn bcd_encode(value: u8) -> u8 {
    ((value / 10) << 4) | (value % 10)
}
