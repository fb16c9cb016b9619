use crate::error::{HeaderError, Result};

/// Bytes every cell occupies on disk, whatever its declared type
pub const CELL_SIZE: usize = 4;

/// Declared scalar type of a BAR column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Double,
    Float,
    Integer,
    Short,
    Char,
    UInteger,
    UShort,
    UChar,
}
impl ColumnType {
    /// Decodes the `int32` wire code
    pub fn from_code(code: i32) -> Result<Self> {
        Ok(match code {
            0 => Self::Double,
            1 => Self::Float,
            2 => Self::Integer,
            3 => Self::Short,
            4 => Self::Char,
            5 => Self::UInteger,
            6 => Self::UShort,
            7 => Self::UChar,
            _ => return Err(HeaderError::InvalidColumnType(code).into()),
        })
    }

    #[must_use]
    pub fn code(self) -> i32 {
        match self {
            Self::Double => 0,
            Self::Float => 1,
            Self::Integer => 2,
            Self::Short => 3,
            Self::Char => 4,
            Self::UInteger => 5,
            Self::UShort => 6,
            Self::UChar => 7,
        }
    }

    /// Declared width of the type
    ///
    /// # Errors
    ///
    /// `Double` has no fixed width and is rejected.
    pub fn size(self) -> Result<usize> {
        match self {
            Self::Float | Self::Integer | Self::UInteger => Ok(4),
            Self::Short | Self::UShort => Ok(2),
            Self::Char | Self::UChar => Ok(1),
            Self::Double => Err(HeaderError::UnsupportedColumnType(self).into()),
        }
    }

    /// Cells of this type are stored as `int32`; all others as `float32`
    #[must_use]
    pub fn is_integer(self) -> bool {
        self == Self::Integer
    }
}

/// Sum of the declared widths of `columns`
pub fn data_row_size(columns: &[ColumnType]) -> Result<usize> {
    columns.iter().copied().map(ColumnType::size).sum()
}

/// A single cell value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResultValue {
    Double(f64),
    Float(f32),
    Integer(i32),
    Short(i16),
    Char(i8),
    UInteger(u32),
    UShort(u16),
    UChar(u8),
}
impl ResultValue {
    /// Decodes a cell of a column of type `column`
    ///
    /// Only `Integer` and `Float` values are ever produced.
    #[must_use]
    pub fn decode(column: ColumnType, bytes: [u8; 4]) -> Self {
        if column.is_integer() {
            Self::Integer(i32::from_be_bytes(bytes))
        } else {
            Self::Float(f32::from_be_bytes(bytes))
        }
    }

    /// Encodes the value for a column of type `column`
    #[must_use]
    pub fn encode(&self, column: ColumnType) -> [u8; 4] {
        if column.is_integer() {
            self.to_i32().to_be_bytes()
        } else {
            self.to_f32().to_be_bytes()
        }
    }

    #[allow(
        clippy::cast_possible_wrap,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    #[must_use]
    pub fn to_i32(&self) -> i32 {
        match *self {
            Self::Double(v) => v as i32,
            Self::Float(v) => v as i32,
            Self::Integer(v) => v,
            Self::Short(v) => i32::from(v),
            Self::Char(v) => i32::from(v),
            Self::UInteger(v) => v as i32,
            Self::UShort(v) => i32::from(v),
            Self::UChar(v) => i32::from(v),
        }
    }

    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn to_f32(&self) -> f32 {
        match *self {
            Self::Double(v) => v as f32,
            Self::Float(v) => v,
            Self::Integer(v) => v as f32,
            Self::Short(v) => f32::from(v),
            Self::Char(v) => f32::from(v),
            Self::UInteger(v) => v as f32,
            Self::UShort(v) => f32::from(v),
            Self::UChar(v) => f32::from(v),
        }
    }

    #[must_use]
    pub fn as_integer(&self) -> Option<i32> {
        match *self {
            Self::Integer(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f32> {
        match *self {
            Self::Float(v) => Some(v),
            _ => None,
        }
    }
}

#[cfg(test)]
mod testing {
    use super::*;

    #[test]
    fn test_row_size() -> Result<()> {
        let columns = [ColumnType::Integer, ColumnType::Float, ColumnType::UShort];
        assert_eq!(data_row_size(&columns)?, 10);
        assert_eq!(data_row_size(&[ColumnType::Char, ColumnType::UChar])?, 2);
        assert_eq!(data_row_size(&[])?, 0);
        Ok(())
    }

    #[test]
    fn test_double_unsupported() {
        let err = data_row_size(&[ColumnType::Integer, ColumnType::Double]).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::HeaderError(HeaderError::UnsupportedColumnType(ColumnType::Double))
        ));
    }

    #[test]
    fn test_codes() {
        for code in 0..8 {
            assert_eq!(ColumnType::from_code(code).unwrap().code(), code);
        }
        assert!(ColumnType::from_code(8).is_err());
        assert!(ColumnType::from_code(-1).is_err());
    }

    #[test]
    fn test_cell_typing() {
        let bytes = ResultValue::UShort(7).encode(ColumnType::UShort);
        assert_eq!(ResultValue::decode(ColumnType::UShort, bytes), ResultValue::Float(7.0));

        let bytes = ResultValue::Float(-3.9).encode(ColumnType::Integer);
        assert_eq!(ResultValue::decode(ColumnType::Integer, bytes), ResultValue::Integer(-3));

        let bytes = ResultValue::Integer(12).encode(ColumnType::Integer);
        assert_eq!(bytes, [0, 0, 0, 12]);
        assert_eq!(ResultValue::Integer(12).as_float(), None);
    }
}
