//! INTERVAL DAY TO SECOND, bound and fetched through interval descriptors

use crate::{Error, Result, Value, oci::*, var::VarBuffer};
use chrono::Duration;
use libc::c_void;
use std::ptr;

const MICROS_PER_SECOND : i64 = 1_000_000;
const MICROS_PER_MINUTE : i64 = 60 * MICROS_PER_SECOND;
const MICROS_PER_HOUR   : i64 = 60 * MICROS_PER_MINUTE;
const MICROS_PER_DAY    : i64 = 24 * MICROS_PER_HOUR;

/// Interval components: days, hours, minutes, seconds and nanoseconds.
pub(crate) type Parts = (i32, i32, i32, i32, i32);

/**
Splits a duration into interval components. All components carry the sign
of the duration. Precision is limited to microseconds.
*/
pub(crate) fn split(d: &Duration) -> Result<Parts> {
    let micros = d.num_microseconds()
        .ok_or_else(|| Error::msg(format!("interval {} is out of range", d)))?;
    let sign = if micros < 0 { -1 } else { 1 };
    let micros = micros.abs();
    let days    = micros / MICROS_PER_DAY;
    let hours   = micros % MICROS_PER_DAY / MICROS_PER_HOUR;
    let minutes = micros % MICROS_PER_HOUR / MICROS_PER_MINUTE;
    let seconds = micros % MICROS_PER_MINUTE / MICROS_PER_SECOND;
    let fsec    = micros % MICROS_PER_SECOND * 1000;
    if days > i32::MAX as i64 {
        return Err( Error::msg(format!("interval {} is out of range", d)) );
    }
    Ok( (
        sign * days as i32,
        sign * hours as i32,
        sign * minutes as i32,
        sign * seconds as i32,
        sign * fsec as i32,
    ) )
}

/// Builds a duration from interval components, truncated to microseconds.
pub(crate) fn join(parts: Parts) -> Duration {
    let (days, hours, minutes, seconds, fsec) = parts;
    Duration::days(days as i64)
        + Duration::hours(hours as i64)
        + Duration::minutes(minutes as i64)
        + Duration::seconds(seconds as i64)
        + Duration::microseconds(fsec as i64 / 1000)
}

pub(crate) fn initialize(var: &mut VarBuffer) -> Result<()> {
    let env = var.env.env_ptr();
    for slot in var.ptrs_mut()?.iter_mut() {
        let res = unsafe {
            OCIDescriptorAlloc(env as *const c_void, slot, OCI_DTYPE_INTERVAL_DS, 0, ptr::null())
        };
        if res != OCI_SUCCESS {
            return Err( Error::env(env, res).at("DescriptorAlloc") );
        }
    }
    Ok(())
}

pub(crate) fn finalize(var: &mut VarBuffer) {
    if let Ok(slots) = var.ptrs_mut() {
        for slot in slots.iter_mut() {
            let desc = std::mem::replace(slot, ptr::null_mut());
            if !desc.is_null() {
                unsafe {
                    OCIDescriptorFree(desc, OCI_DTYPE_INTERVAL_DS);
                }
            }
        }
    }
}

pub(crate) fn set_value(var: &mut VarBuffer, pos: usize, value: &Value) -> Result<()> {
    let (days, hours, minutes, seconds, fsec) = match value {
        Value::Interval(d) => split(d)?,
        _ => return Err( value.conversion_error(var.vtype.name()) ),
    };
    let interval = var.ptrs()?[pos] as *mut OCIInterval;
    let res = unsafe {
        OCIIntervalSetDaySecond(
            var.env.env_ptr() as *mut c_void, var.env.err_ptr(),
            days, hours, minutes, seconds, fsec, interval
        )
    };
    var.env.check_status(res, "IntervalSetDaySecond")
}

pub(crate) fn get_value(var: &VarBuffer, pos: usize) -> Result<Value> {
    let interval = var.ptrs()?[pos] as *const OCIInterval;
    let (mut days, mut hours, mut minutes, mut seconds, mut fsec) = (0, 0, 0, 0, 0);
    let res = unsafe {
        OCIIntervalGetDaySecond(
            var.env.env_ptr() as *mut c_void, var.env.err_ptr(),
            &mut days, &mut hours, &mut minutes, &mut seconds, &mut fsec,
            interval
        )
    };
    var.env.check_status(res, "IntervalGetDaySecond")?;
    Ok( Value::Interval(join((days, hours, minutes, seconds, fsec))) )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive() {
        let d = Duration::days(3) + Duration::hours(4) + Duration::minutes(5) + Duration::seconds(6) + Duration::microseconds(7);
        assert_eq!(split(&d).unwrap(), (3, 4, 5, 6, 7000));
        assert_eq!(join((3, 4, 5, 6, 7000)), d);
    }

    #[test]
    fn negative() {
        let d = -(Duration::days(1) + Duration::seconds(1) + Duration::milliseconds(250));
        assert_eq!(split(&d).unwrap(), (-1, 0, 0, -1, -250_000_000));
        assert_eq!(join(split(&d).unwrap()), d);
    }

    #[test]
    fn nanoseconds_are_truncated() {
        assert_eq!(join((0, 0, 0, 0, 1999)), Duration::microseconds(1));
        assert_eq!(split(&Duration::nanoseconds(1500)).unwrap(), (0, 0, 0, 0, 1000));
    }

    #[test]
    fn zero() {
        assert_eq!(split(&Duration::zero()).unwrap(), (0, 0, 0, 0, 0));
    }
}
