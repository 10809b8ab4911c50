use bytes::{BufMut, Bytes, BytesMut};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// 100ns ticks between 1601-01-01 and the Unix epoch.
const FILETIME_UNIX_OFFSET: i64 = 116_444_736_000_000_000;

/// Byte order used when rendering a [`PlcValue`] to bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByteOrder {
    #[default]
    LittleEndian,
    BigEndian,
}

/// A value written to a device item.
///
/// Covers the data types every driver is expected to accept. Drivers that
/// need richer types convert at their own boundary.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum PlcValue {
    Bool(bool),
    Byte(i8),
    Short(i16),
    Integer(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    /// Integers wider than `Long`. Rendered in the narrowest of 4, 8 or 16
    /// bytes that holds the value.
    BigInteger(i128),
    /// A point in time, rendered as a Windows FILETIME: 100ns ticks since
    /// 1601-01-01 UTC in 8 bytes.
    DateTime(DateTime<Utc>),
    String(String),
    Bytes(Vec<u8>),
}

impl PlcValue {
    /// Name of the data type, as used in diagnostics output.
    pub fn type_name(&self) -> &'static str {
        match self {
            PlcValue::Bool(_) => "bool",
            PlcValue::Byte(_) => "byte",
            PlcValue::Short(_) => "short",
            PlcValue::Integer(_) => "integer",
            PlcValue::Long(_) => "long",
            PlcValue::Float(_) => "float",
            PlcValue::Double(_) => "double",
            PlcValue::BigInteger(_) => "big_integer",
            PlcValue::DateTime(_) => "date_time",
            PlcValue::String(_) => "string",
            PlcValue::Bytes(_) => "bytes",
        }
    }

    /// Canonical byte representation.
    ///
    /// Booleans take one byte, numerics use `order`, strings are
    /// null-terminated and raw bytes are passed through untouched.
    pub fn to_bytes(&self, order: ByteOrder) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        match (self, order) {
            (PlcValue::Bool(v), _) => buf.put_u8(u8::from(*v)),
            (PlcValue::Byte(v), _) => buf.put_i8(*v),
            (PlcValue::Short(v), ByteOrder::LittleEndian) => buf.put_i16_le(*v),
            (PlcValue::Short(v), ByteOrder::BigEndian) => buf.put_i16(*v),
            (PlcValue::Integer(v), ByteOrder::LittleEndian) => buf.put_i32_le(*v),
            (PlcValue::Integer(v), ByteOrder::BigEndian) => buf.put_i32(*v),
            (PlcValue::Long(v), ByteOrder::LittleEndian) => buf.put_i64_le(*v),
            (PlcValue::Long(v), ByteOrder::BigEndian) => buf.put_i64(*v),
            (PlcValue::Float(v), ByteOrder::LittleEndian) => buf.put_f32_le(*v),
            (PlcValue::Float(v), ByteOrder::BigEndian) => buf.put_f32(*v),
            (PlcValue::Double(v), ByteOrder::LittleEndian) => buf.put_f64_le(*v),
            (PlcValue::Double(v), ByteOrder::BigEndian) => buf.put_f64(*v),
            (PlcValue::BigInteger(v), ByteOrder::LittleEndian) => {
                buf.put_slice(&v.to_le_bytes()[..big_integer_width(*v)]);
            }
            (PlcValue::BigInteger(v), ByteOrder::BigEndian) => {
                buf.put_slice(&v.to_be_bytes()[16 - big_integer_width(*v)..]);
            }
            (PlcValue::DateTime(v), ByteOrder::LittleEndian) => buf.put_i64_le(filetime(v)),
            (PlcValue::DateTime(v), ByteOrder::BigEndian) => buf.put_i64(filetime(v)),
            (PlcValue::String(v), _) => {
                buf.put_slice(v.as_bytes());
                buf.put_u8(0);
            }
            (PlcValue::Bytes(v), _) => buf.put_slice(v),
        }
        buf.freeze()
    }

    fn encoded_len(&self) -> usize {
        match self {
            PlcValue::Bool(_) | PlcValue::Byte(_) => 1,
            PlcValue::Short(_) => 2,
            PlcValue::Integer(_) | PlcValue::Float(_) => 4,
            PlcValue::Long(_) | PlcValue::Double(_) | PlcValue::DateTime(_) => 8,
            PlcValue::BigInteger(v) => big_integer_width(*v),
            PlcValue::String(v) => v.len() + 1,
            PlcValue::Bytes(v) => v.len(),
        }
    }
}

fn big_integer_width(v: i128) -> usize {
    if i32::try_from(v).is_ok() {
        4
    } else if i64::try_from(v).is_ok() {
        8
    } else {
        16
    }
}

/// Saturates outside the FILETIME range.
fn filetime(v: &DateTime<Utc>) -> i64 {
    v.timestamp()
        .saturating_mul(10_000_000)
        .saturating_add(i64::from(v.timestamp_subsec_nanos() / 100))
        .saturating_add(FILETIME_UNIX_OFFSET)
}

impl From<bool> for PlcValue {
    fn from(v: bool) -> Self {
        PlcValue::Bool(v)
    }
}

impl From<i16> for PlcValue {
    fn from(v: i16) -> Self {
        PlcValue::Short(v)
    }
}

impl From<i32> for PlcValue {
    fn from(v: i32) -> Self {
        PlcValue::Integer(v)
    }
}

impl From<i64> for PlcValue {
    fn from(v: i64) -> Self {
        PlcValue::Long(v)
    }
}

impl From<f32> for PlcValue {
    fn from(v: f32) -> Self {
        PlcValue::Float(v)
    }
}

impl From<f64> for PlcValue {
    fn from(v: f64) -> Self {
        PlcValue::Double(v)
    }
}

impl From<i128> for PlcValue {
    fn from(v: i128) -> Self {
        PlcValue::BigInteger(v)
    }
}

impl From<DateTime<Utc>> for PlcValue {
    fn from(v: DateTime<Utc>) -> Self {
        PlcValue::DateTime(v)
    }
}

impl From<&str> for PlcValue {
    fn from(v: &str) -> Self {
        PlcValue::String(v.to_string())
    }
}

impl From<String> for PlcValue {
    fn from(v: String) -> Self {
        PlcValue::String(v)
    }
}

impl From<Vec<u8>> for PlcValue {
    fn from(v: Vec<u8>) -> Self {
        PlcValue::Bytes(v)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn sample_time() -> DateTime<Utc> {
        Utc.timestamp_millis_opt(283_686_951_976_960).unwrap()
    }

    #[test]
    fn little_endian_representations() {
        let le = ByteOrder::LittleEndian;
        assert_eq!(PlcValue::Bool(true).to_bytes(le).as_ref(), &[0x01]);
        assert_eq!(PlcValue::Byte(1).to_bytes(le).as_ref(), &[0x01]);
        assert_eq!(PlcValue::Short(1).to_bytes(le).as_ref(), &[0x01, 0x00]);
        assert_eq!(
            PlcValue::Integer(1).to_bytes(le).as_ref(),
            &[0x01, 0x00, 0x00, 0x00]
        );
        assert_eq!(
            PlcValue::Float(1.0).to_bytes(le).as_ref(),
            &[0x00, 0x00, 0x80, 0x3F]
        );
        assert_eq!(
            PlcValue::Double(1.0).to_bytes(le).as_ref(),
            &[0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xF0, 0x3F]
        );
    }

    #[test]
    fn big_endian_reverses_numeric_bytes() {
        for value in [
            PlcValue::Short(1),
            PlcValue::Integer(1),
            PlcValue::Long(-2),
            PlcValue::Float(1.0),
            PlcValue::Double(1.0),
            PlcValue::BigInteger(1),
            PlcValue::BigInteger(-(1 << 40)),
            PlcValue::BigInteger(i128::MAX),
            PlcValue::DateTime(sample_time()),
        ] {
            let mut le = value.to_bytes(ByteOrder::LittleEndian).to_vec();
            le.reverse();
            assert_eq!(
                le,
                value.to_bytes(ByteOrder::BigEndian).to_vec(),
                "{}",
                value.type_name()
            );
        }
    }

    #[test]
    fn strings_are_null_terminated_and_bytes_pass_through() {
        assert_eq!(
            PlcValue::from("Hello World!")
                .to_bytes(ByteOrder::BigEndian)
                .as_ref(),
            b"Hello World!\0"
        );
        assert_eq!(
            PlcValue::from(vec![1u8, 2, 3, 4])
                .to_bytes(ByteOrder::BigEndian)
                .as_ref(),
            &[1, 2, 3, 4]
        );
    }

    #[test]
    fn big_integers_use_the_narrowest_width() {
        let le = ByteOrder::LittleEndian;
        assert_eq!(
            PlcValue::BigInteger(1).to_bytes(le).as_ref(),
            &[0x01, 0x00, 0x00, 0x00]
        );
        assert_eq!(
            PlcValue::BigInteger(-1).to_bytes(le).as_ref(),
            &[0xFF, 0xFF, 0xFF, 0xFF]
        );
        assert_eq!(
            PlcValue::BigInteger(1 << 32).to_bytes(le).as_ref(),
            &[0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00]
        );
        assert_eq!(PlcValue::BigInteger(1 << 64).to_bytes(le).len(), 16);
        assert_eq!(
            PlcValue::BigInteger(1 << 32).to_bytes(ByteOrder::BigEndian).as_ref(),
            &[0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn date_times_render_as_filetime() {
        let value = PlcValue::from(sample_time());
        assert_eq!(value.type_name(), "date_time");
        assert_eq!(
            value.to_bytes(ByteOrder::LittleEndian).as_ref(),
            &[0x00, 0x80, 0x3E, 0x15, 0xAB, 0x47, 0xFC, 0x28]
        );

        let epoch = PlcValue::DateTime(Utc.timestamp_opt(0, 0).unwrap());
        assert_eq!(
            epoch.to_bytes(ByteOrder::BigEndian).as_ref(),
            &FILETIME_UNIX_OFFSET.to_be_bytes()
        );
    }

    #[test]
    fn serializes_with_type_tag() {
        let json = serde_json::to_string(&PlcValue::Integer(7)).unwrap();
        assert_eq!(json, r#"{"type":"integer","value":7}"#);

        let json = serde_json::to_string(&PlcValue::BigInteger(7)).unwrap();
        assert_eq!(json, r#"{"type":"big_integer","value":7}"#);
        let json = serde_json::to_string(&PlcValue::DateTime(Utc.timestamp_opt(0, 0).unwrap()))
            .unwrap();
        assert_eq!(json, r#"{"type":"date_time","value":"1970-01-01T00:00:00Z"}"#);
    }
}
