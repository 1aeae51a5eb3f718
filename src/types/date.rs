//! DATE, bound and fetched as `OCIDate`

use crate::{Error, Result, Value, oci::{OCIDate, OCITime}, var::VarBuffer};
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use std::{convert::TryFrom, mem, ptr};

pub(crate) fn to_oci_date(dt: &NaiveDateTime) -> Result<OCIDate> {
    let year = i16::try_from(dt.year())
        .map_err(|_| Error::msg(format!("year {} is out of range", dt.year())))?;
    Ok( OCIDate {
        year,
        month: dt.month() as u8,
        day:   dt.day() as u8,
        time: OCITime {
            hh: dt.hour() as u8,
            mi: dt.minute() as u8,
            ss: dt.second() as u8,
        },
    } )
}

pub(crate) fn from_oci_date(date: &OCIDate) -> Result<NaiveDateTime> {
    NaiveDate::from_ymd_opt(date.year as i32, date.month as u32, date.day as u32)
        .and_then(|d| d.and_hms_opt(date.time.hh as u32, date.time.mi as u32, date.time.ss as u32))
        .ok_or_else(|| Error::msg(format!(
            "invalid date {}-{}-{} {}:{}:{}",
            date.year, date.month, date.day, date.time.hh, date.time.mi, date.time.ss
        )))
}

pub(crate) fn set_value(var: &mut VarBuffer, pos: usize, value: &Value) -> Result<()> {
    let date = match value {
        Value::DateTime(dt) => to_oci_date(dt)?,
        _ => return Err( value.conversion_error(var.vtype.name()) ),
    };
    let bytes = var.element_mut(pos)?;
    if bytes.len() < mem::size_of::<OCIDate>() {
        return Err( Error::new(crate::err::msg::INSUFFICIENT_SPACE) );
    }
    unsafe {
        ptr::write_unaligned(bytes.as_mut_ptr() as *mut OCIDate, date);
    }
    Ok(())
}

pub(crate) fn get_value(var: &VarBuffer, pos: usize) -> Result<Value> {
    let bytes = var.element(pos)?;
    if bytes.len() < mem::size_of::<OCIDate>() {
        return Err( Error::new(crate::err::msg::INSUFFICIENT_SPACE) );
    }
    let date = unsafe { ptr::read_unaligned(bytes.as_ptr() as *const OCIDate) };
    Ok( Value::DateTime(from_oci_date(&date)?) )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversions() {
        let dt = NaiveDate::from_ymd_opt(2019, 12, 31).unwrap().and_hms_opt(23, 59, 58).unwrap();
        let date = to_oci_date(&dt).unwrap();
        assert_eq!(date.year, 2019);
        assert_eq!((date.month, date.day), (12, 31));
        assert_eq!((date.time.hh, date.time.mi, date.time.ss), (23, 59, 58));
        assert_eq!(from_oci_date(&date).unwrap(), dt);
    }

    #[test]
    fn subseconds_are_dropped() {
        let dt = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap().and_hms_milli_opt(0, 0, 1, 500).unwrap();
        let date = to_oci_date(&dt).unwrap();
        assert_eq!(from_oci_date(&date).unwrap(), NaiveDate::from_ymd_opt(2000, 1, 1).unwrap().and_hms_opt(0, 0, 1).unwrap());
    }

    #[test]
    fn bad_dates() {
        let date = OCIDate { year: 2021, month: 2, day: 30, time: OCITime::default() };
        assert!(from_oci_date(&date).is_err());
        let dt = NaiveDate::from_ymd_opt(40000, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        assert!(to_oci_date(&dt).is_err());
    }
}
