//! Typed value accessors and row scanning.
//!
//! Each getter declares the set of column datatypes it accepts; calling it
//! on an incompatible column is a programming error and panics. Getters
//! return `None` when the column holds NULL.

use chrono::{DateTime, FixedOffset, Local, LocalResult, TimeZone, Utc};

use rsql_types::{Datatype, Field};

use crate::batch::{Batch, BatchStatus};
use crate::error::{Error, Result};

impl Batch<'_> {
    /// Number of columns in the current recordset.
    #[must_use]
    pub fn col_count(&self) -> usize {
        self.row.len()
    }

    /// Datatype of column `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i` is out of bounds.
    #[must_use]
    pub fn col_datatype(&self, i: usize) -> Datatype {
        self.row[i].datatype()
    }

    /// Whether column `i` holds NULL.
    ///
    /// # Panics
    ///
    /// Panics if `i` is out of bounds.
    #[must_use]
    pub fn col_is_null(&self, i: usize) -> bool {
        self.row[i].is_null()
    }

    /// Boolean value of column `i`, or `None` when NULL.
    ///
    /// For `VARCHAR` columns the values `1`, `t`, `T`, `true`, `TRUE` and
    /// `True` read as true (and their counterparts as false; anything else
    /// reads as false). For numeric columns any nonzero value reads as
    /// true.
    ///
    /// # Panics
    ///
    /// Panics on columns that are not `VARCHAR`, `BIT`, `TINYINT`,
    /// `SMALLINT`, `INT`, `BIGINT` or `FLOAT`.
    #[must_use]
    pub fn col_bool(&self, i: usize) -> Option<bool> {
        let field = &self.row[i];
        if field.is_null() {
            return None;
        }

        let value = match field {
            Field::Varchar { value, .. } => parse_bool_literal(value).unwrap_or(false),
            Field::Bit { value, .. } => *value != 0,
            Field::Tinyint { value, .. } => *value != 0,
            Field::Smallint { value, .. } => *value != 0,
            Field::Int { value, .. } => *value != 0,
            Field::Bigint { value, .. } => *value != 0,
            Field::Float { value, .. } => *value != 0.0,
            other => panic!(
                "column {i} of type {} cannot be read as bool",
                other.datatype()
            ),
        };
        Some(value)
    }

    /// Binary value of column `i`, or `None` when NULL.
    ///
    /// The returned slice aliases the row buffer and is overwritten by the
    /// next row read; copy it to keep it.
    ///
    /// # Panics
    ///
    /// Panics on columns that are not `VARBINARY`.
    #[must_use]
    pub fn col_binary(&self, i: usize) -> Option<&[u8]> {
        let field = &self.row[i];
        if field.is_null() {
            return None;
        }

        match field {
            Field::Varbinary { value, .. } => Some(value),
            other => panic!("column {i} of type {} is not binary", other.datatype()),
        }
    }

    /// String value of column `i`, or `None` when NULL.
    ///
    /// Callable on any datatype: character and decimal columns yield their
    /// exact wire text, every other type its formatted rendering.
    ///
    /// # Panics
    ///
    /// Panics if `i` is out of bounds.
    #[must_use]
    pub fn col_string(&self, i: usize) -> Option<String> {
        let field = &self.row[i];
        if field.is_null() {
            return None;
        }

        let value = match field {
            Field::Varchar { value, .. }
            | Field::Money { value, .. }
            | Field::Numeric { value, .. } => String::from_utf8_lossy(value).into_owned(),
            other => other.to_string(),
        };
        Some(value)
    }

    /// Integer value of column `i`, or `None` when NULL.
    ///
    /// # Panics
    ///
    /// Panics on columns that are not `BIT`, `TINYINT`, `SMALLINT`, `INT`
    /// or `BIGINT`.
    #[must_use]
    pub fn col_int64(&self, i: usize) -> Option<i64> {
        let field = &self.row[i];
        if field.is_null() {
            return None;
        }

        let value = match field {
            Field::Bit { value, .. } => i64::from(*value),
            Field::Tinyint { value, .. } => i64::from(*value),
            Field::Smallint { value, .. } => i64::from(*value),
            Field::Int { value, .. } => i64::from(*value),
            Field::Bigint { value, .. } => *value,
            other => panic!("column {i} of type {} is not an integer", other.datatype()),
        };
        Some(value)
    }

    /// Same as [`Batch::col_int64`], narrowed to `isize` for convenience.
    #[must_use]
    pub fn col_int(&self, i: usize) -> Option<isize> {
        self.col_int64(i).map(|v| v as isize)
    }

    /// Numeric value of column `i` as its exact decimal text, or `None`
    /// when NULL.
    ///
    /// # Panics
    ///
    /// Panics on columns that are not `BIT`, `TINYINT`, `SMALLINT`, `INT`,
    /// `BIGINT`, `MONEY` or `NUMERIC`.
    #[must_use]
    pub fn col_numeric(&self, i: usize) -> Option<String> {
        let field = &self.row[i];
        if field.is_null() {
            return None;
        }

        let value = match field {
            Field::Bit { .. }
            | Field::Tinyint { .. }
            | Field::Smallint { .. }
            | Field::Int { .. }
            | Field::Bigint { .. } => field.to_string(),
            Field::Money { value, .. } | Field::Numeric { value, .. } => {
                String::from_utf8_lossy(value).into_owned()
            }
            other => panic!(
                "column {i} of type {} is not an integer, money or numeric",
                other.datatype()
            ),
        };
        Some(value)
    }

    /// Float value of column `i`, or `None` when NULL.
    ///
    /// # Panics
    ///
    /// Panics on columns that are not `FLOAT`.
    #[must_use]
    pub fn col_float64(&self, i: usize) -> Option<f64> {
        let field = &self.row[i];
        if field.is_null() {
            return None;
        }

        match field {
            Field::Float { value, .. } => Some(*value),
            other => panic!("column {i} of type {} is not a float", other.datatype()),
        }
    }

    /// Temporal value of column `i` in UTC, or `None` when NULL.
    ///
    /// For `TIME` columns the date part is 1900-01-01, the zero date of the
    /// server's T-SQL dialect.
    ///
    /// # Panics
    ///
    /// Panics on columns that are not `DATE`, `TIME` or `DATETIME`.
    #[must_use]
    pub fn col_datetime_utc(&self, i: usize) -> Option<DateTime<Utc>> {
        let field = &self.row[i];
        if field.is_null() {
            return None;
        }

        match field {
            Field::Date { value, .. }
            | Field::Time { value, .. }
            | Field::Datetime { value, .. } => Some(*value),
            other => panic!(
                "column {i} of type {} is not a date, time or datetime",
                other.datatype()
            ),
        }
    }

    /// Temporal value of column `i` reinterpreted in the local zone, or
    /// `None` when NULL.
    ///
    /// For `DATE` and `DATETIME` the wall-clock components are kept and the
    /// zone changes, which shifts the absolute instant (see
    /// [`localize_time`]). `TIME` stays in UTC so that time-of-day
    /// arithmetic is independent of daylight saving.
    ///
    /// # Panics
    ///
    /// Panics on columns that are not `DATE`, `TIME` or `DATETIME`.
    #[must_use]
    pub fn col_datetime(&self, i: usize) -> Option<DateTime<FixedOffset>> {
        let field = &self.row[i];
        if field.is_null() {
            return None;
        }

        match field {
            Field::Time { value, .. } => Some(value.fixed_offset()),
            Field::Date { value, .. } | Field::Datetime { value, .. } => {
                Some(localize_time(*value))
            }
            other => panic!(
                "column {i} of type {} is not a date, time or datetime",
                other.datatype()
            ),
        }
    }

    /// Copy the current row into caller-provided destinations.
    ///
    /// Takes a tuple of mutable references, one per column, in column
    /// order:
    ///
    /// ```rust,ignore
    /// let mut id: i32 = 0;
    /// let mut name = String::new();
    /// while batch.next().await {
    ///     batch.scan((&mut id, &mut name))?;
    /// }
    /// ```
    ///
    /// Supported destinations: `bool`, `Vec<u8>` (always copied),
    /// `String`, the signed and unsigned integer widths, `f64`,
    /// `DateTime<Utc>` and `DateTime<FixedOffset>`. NULL columns leave the
    /// zero value of the destination. Narrowing integer destinations fail
    /// the whole scan on overflow; unsigned destinations reject negative
    /// values.
    ///
    /// # Panics
    ///
    /// Panics when a destination type is used on a column datatype its
    /// getter does not accept.
    pub fn scan<D: ScanDestinations>(&self, dest: D) -> Result<()> {
        if let Some(err) = &self.err {
            return Err(err.clone());
        }
        if self.status != BatchStatus::RecordAvailable {
            return Err(Error::ScanNoRow);
        }
        if D::ARITY != self.col_count() {
            return Err(Error::ScanArity {
                provided: D::ARITY,
                columns: self.col_count(),
            });
        }

        dest.apply(self)
    }
}

fn parse_bool_literal(bytes: &[u8]) -> Option<bool> {
    match bytes {
        b"1" | b"t" | b"T" | b"true" | b"TRUE" | b"True" => Some(true),
        b"0" | b"f" | b"F" | b"false" | b"FALSE" | b"False" => Some(false),
        _ => None,
    }
}

/// Reinterpret a UTC instant in the local zone, keeping its wall-clock
/// components.
///
/// The absolute instant usually shifts so that the presentation time stays
/// the same:
///
/// ```text
/// 2009-11-10 23:00:00 +0000 UTC  ->  2009-11-10 23:00:00 +0100 CET
/// ```
///
/// During a daylight-saving gap, where the wall-clock time does not exist
/// locally, the instant is returned unshifted.
#[must_use]
pub fn localize_time(t: DateTime<Utc>) -> DateTime<FixedOffset> {
    let naive = t.naive_utc();
    match Local.from_local_datetime(&naive) {
        LocalResult::Single(local) => local.fixed_offset(),
        LocalResult::Ambiguous(earliest, _) => earliest.fixed_offset(),
        LocalResult::None => t.fixed_offset(),
    }
}

/// A type the cursor can copy a column value into.
///
/// This trait is sealed; the supported destination kinds are fixed.
pub trait ScanTarget: private::SealedTarget {
    /// Copy the value of column `index` into `self`.
    fn assign(&mut self, batch: &Batch<'_>, index: usize) -> Result<()>;
}

impl ScanTarget for bool {
    fn assign(&mut self, batch: &Batch<'_>, index: usize) -> Result<()> {
        *self = batch.col_bool(index).unwrap_or(false);
        Ok(())
    }
}

impl ScanTarget for Vec<u8> {
    fn assign(&mut self, batch: &Batch<'_>, index: usize) -> Result<()> {
        self.clear();
        if let Some(bytes) = batch.col_binary(index) {
            self.extend_from_slice(bytes);
        }
        Ok(())
    }
}

impl ScanTarget for String {
    fn assign(&mut self, batch: &Batch<'_>, index: usize) -> Result<()> {
        *self = batch.col_string(index).unwrap_or_default();
        Ok(())
    }
}

macro_rules! impl_scan_signed {
    ($($ty:ty),+) => {
        $(
            impl ScanTarget for $ty {
                fn assign(&mut self, batch: &Batch<'_>, index: usize) -> Result<()> {
                    let value = batch.col_int64(index).unwrap_or(0);
                    *self = <$ty>::try_from(value).map_err(|_| Error::ScanColumn {
                        column: index,
                        dest: stringify!($ty),
                        reason: "overflow",
                    })?;
                    Ok(())
                }
            }
        )+
    };
}

macro_rules! impl_scan_unsigned {
    ($($ty:ty),+) => {
        $(
            impl ScanTarget for $ty {
                fn assign(&mut self, batch: &Batch<'_>, index: usize) -> Result<()> {
                    let value = batch.col_int64(index).unwrap_or(0);
                    if value < 0 {
                        return Err(Error::ScanColumn {
                            column: index,
                            dest: stringify!($ty),
                            reason: "negative value",
                        });
                    }
                    *self = <$ty>::try_from(value).map_err(|_| Error::ScanColumn {
                        column: index,
                        dest: stringify!($ty),
                        reason: "overflow",
                    })?;
                    Ok(())
                }
            }
        )+
    };
}

impl_scan_signed!(i8, i16, i32, i64, isize);
impl_scan_unsigned!(u8, u16, u32, u64, usize);

impl ScanTarget for f64 {
    fn assign(&mut self, batch: &Batch<'_>, index: usize) -> Result<()> {
        *self = batch.col_float64(index).unwrap_or(0.0);
        Ok(())
    }
}

impl ScanTarget for DateTime<Utc> {
    fn assign(&mut self, batch: &Batch<'_>, index: usize) -> Result<()> {
        *self = batch.col_datetime_utc(index).unwrap_or(DateTime::UNIX_EPOCH);
        Ok(())
    }
}

impl ScanTarget for DateTime<FixedOffset> {
    fn assign(&mut self, batch: &Batch<'_>, index: usize) -> Result<()> {
        *self = batch
            .col_datetime(index)
            .unwrap_or_else(|| DateTime::UNIX_EPOCH.fixed_offset());
        Ok(())
    }
}

/// A tuple of mutable references accepted by [`Batch::scan`].
///
/// This trait is sealed; it is implemented for tuples of [`ScanTarget`]
/// references up to twelve columns.
pub trait ScanDestinations: private::SealedDestinations {
    /// Number of destinations in the tuple.
    const ARITY: usize;

    /// Copy the current row into the destinations.
    fn apply(self, batch: &Batch<'_>) -> Result<()>;
}

macro_rules! impl_scan_destinations {
    ($count:expr; $($ty:ident : $idx:tt),+) => {
        impl<'d, $($ty: ScanTarget),+> private::SealedDestinations for ($(&'d mut $ty,)+) {}

        impl<'d, $($ty: ScanTarget),+> ScanDestinations for ($(&'d mut $ty,)+) {
            const ARITY: usize = $count;

            fn apply(self, batch: &Batch<'_>) -> Result<()> {
                $( self.$idx.assign(batch, $idx)?; )+
                Ok(())
            }
        }
    };
}

impl_scan_destinations!(1; T0:0);
impl_scan_destinations!(2; T0:0, T1:1);
impl_scan_destinations!(3; T0:0, T1:1, T2:2);
impl_scan_destinations!(4; T0:0, T1:1, T2:2, T3:3);
impl_scan_destinations!(5; T0:0, T1:1, T2:2, T3:3, T4:4);
impl_scan_destinations!(6; T0:0, T1:1, T2:2, T3:3, T4:4, T5:5);
impl_scan_destinations!(7; T0:0, T1:1, T2:2, T3:3, T4:4, T5:5, T6:6);
impl_scan_destinations!(8; T0:0, T1:1, T2:2, T3:3, T4:4, T5:5, T6:6, T7:7);
impl_scan_destinations!(9; T0:0, T1:1, T2:2, T3:3, T4:4, T5:5, T6:6, T7:7, T8:8);
impl_scan_destinations!(10; T0:0, T1:1, T2:2, T3:3, T4:4, T5:5, T6:6, T7:7, T8:8, T9:9);
impl_scan_destinations!(11; T0:0, T1:1, T2:2, T3:3, T4:4, T5:5, T6:6, T7:7, T8:8, T9:9, T10:10);
impl_scan_destinations!(12; T0:0, T1:1, T2:2, T3:3, T4:4, T5:5, T6:6, T7:7, T8:8, T9:9, T10:10, T11:11);

mod private {
    use chrono::{DateTime, FixedOffset, Utc};

    pub trait SealedTarget {}

    impl SealedTarget for bool {}
    impl SealedTarget for Vec<u8> {}
    impl SealedTarget for String {}
    impl SealedTarget for i8 {}
    impl SealedTarget for i16 {}
    impl SealedTarget for i32 {}
    impl SealedTarget for i64 {}
    impl SealedTarget for isize {}
    impl SealedTarget for u8 {}
    impl SealedTarget for u16 {}
    impl SealedTarget for u32 {}
    impl SealedTarget for u64 {}
    impl SealedTarget for usize {}
    impl SealedTarget for f64 {}
    impl SealedTarget for DateTime<Utc> {}
    impl SealedTarget for DateTime<FixedOffset> {}

    pub trait SealedDestinations {}
}
