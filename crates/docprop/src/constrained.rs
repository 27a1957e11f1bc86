//! # Constrained Cells
//!
//! `PropertyConstrained<T>` wraps a scalar cell and clamps every incoming
//! value into the active descriptor. Integer-constraint and percent cells use
//! `T = i64`; float-constraint and precision cells use `T = f64`.
//!
//! Values are clamped on every path in: typed setters, dynamic values, path
//! values and restore.

use std::any::Any;

use docprop_stream::{Writer, XmlReader};

use crate::descriptor::{Bounded, Bounds, Constraints, PERCENT_BOUNDS, PRECISION_BOUNDS};
use crate::dynamic::DynValue;
use crate::error::{bad_cast, type_error, PropertyError, Result};
use crate::property::{paste_source, Property, PropertyCore, PropertyKind};
use crate::scalar::{PropertyScalar, ScalarValue};

/// Numeric value types usable in a constrained cell
pub trait ConstrainedValue: ScalarValue + Bounded {
    /// Kind of a freshly constructed cell without a static descriptor
    const CONSTRAINED_KIND: PropertyKind;
    /// Name used in type errors, e.g. `int`
    const TYPE_LABEL: &'static str;
}

impl ConstrainedValue for i64 {
    const CONSTRAINED_KIND: PropertyKind = PropertyKind::IntegerConstraint;
    const TYPE_LABEL: &'static str = "int";
}

impl ConstrainedValue for f64 {
    const CONSTRAINED_KIND: PropertyKind = PropertyKind::FloatConstraint;
    const TYPE_LABEL: &'static str = "float";
}

/// Scalar cell with bounds
#[derive(Debug, Clone)]
pub struct PropertyConstrained<T: 'static> {
    base: PropertyScalar<T>,
    kind: PropertyKind,
    constraints: Option<Constraints<T>>,
}

pub type PropertyIntegerConstraint = PropertyConstrained<i64>;
pub type PropertyPercent = PropertyConstrained<i64>;
pub type PropertyFloatConstraint = PropertyConstrained<f64>;
pub type PropertyPrecision = PropertyConstrained<f64>;

impl<T: ConstrainedValue> PropertyConstrained<T> {
    /// Unconstrained cell; bounds fall back to the absolute limits
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            base: PropertyScalar::new(name),
            kind: T::CONSTRAINED_KIND,
            constraints: None,
        }
    }

    pub fn value(&self) -> T {
        self.base.value()
    }

    /// Set the value, clamped into the active bounds
    pub fn set_value(&mut self, value: T) {
        let clamped = self.clamp(value);
        self.base.set_value(clamped);
    }

    /// Replace the descriptor. The value is left as is until the next set.
    pub fn set_constraints(&mut self, constraints: Option<Constraints<T>>) {
        self.constraints = constraints;
    }

    pub fn constraints(&self) -> Option<&Constraints<T>> {
        self.constraints.as_ref()
    }

    pub fn minimum(&self) -> T {
        self.constraints
            .as_ref()
            .map_or(T::ABSOLUTE_MIN, |c| c.bounds().lower)
    }

    pub fn maximum(&self) -> T {
        self.constraints
            .as_ref()
            .map_or(T::ABSOLUTE_MAX, |c| c.bounds().upper)
    }

    pub fn step_size(&self) -> T {
        self.constraints
            .as_ref()
            .map_or(T::DEFAULT_STEP, |c| c.bounds().step)
    }

    fn clamp(&self, value: T) -> T {
        match &self.constraints {
            Some(constraints) => constraints.bounds().clamp(value),
            None => value,
        }
    }

    /// Install an owned descriptor built from a dict or 4-tuple, then set the value
    fn apply_descriptor(&mut self, value: T, lower: T, upper: T, step: T) -> Result<()> {
        let bounds = Bounds::new(lower, upper, step)?;
        self.constraints = Some(Constraints::from(bounds));
        self.set_value(value);
        Ok(())
    }

    fn type_message(&self) -> String {
        format!("type must be {}, dict or tuple", T::TYPE_LABEL)
    }
}

impl PropertyConstrained<i64> {
    /// Integer cell bound to 0..=100
    pub fn percent(name: impl Into<String>) -> Self {
        Self {
            base: PropertyScalar::new(name),
            kind: PropertyKind::Percent,
            constraints: Some(Constraints::Shared(&PERCENT_BOUNDS)),
        }
    }
}

impl PropertyConstrained<f64> {
    /// Float cell bound to 0..=f64::MAX with a 0.001 step
    pub fn precision(name: impl Into<String>) -> Self {
        Self {
            base: PropertyScalar::new(name),
            kind: PropertyKind::Precision,
            constraints: Some(Constraints::Shared(&PRECISION_BOUNDS)),
        }
    }
}

impl<T: ConstrainedValue> Property for PropertyConstrained<T> {
    fn kind(&self) -> PropertyKind {
        self.kind
    }

    fn core(&self) -> &PropertyCore {
        self.base.core()
    }

    fn core_mut(&mut self) -> &mut PropertyCore {
        self.base.core_mut()
    }

    fn to_dynamic(&self) -> DynValue {
        self.base.to_dynamic()
    }

    /// A number clamps; `{value, min?, max?, step?}` or `(value, min, max, step)`
    /// installs a new owned descriptor first.
    fn from_dynamic(&mut self, value: &DynValue) -> Result<()> {
        match value {
            DynValue::Int(_) | DynValue::Float(_) => {
                let v = T::from_dynamic(value)?;
                self.set_value(v);
                Ok(())
            }
            DynValue::Dict(pairs) => {
                let mut v = None;
                let mut lower = T::ABSOLUTE_MIN;
                let mut upper = T::ABSOLUTE_MAX;
                let mut step = T::DEFAULT_STEP;
                for (key, item) in pairs {
                    match key.as_str() {
                        Some("value") => v = Some(T::from_dynamic(item)?),
                        Some("min") => lower = T::from_dynamic(item)?,
                        Some("max") => upper = T::from_dynamic(item)?,
                        Some("step") => step = T::from_dynamic(item)?,
                        _ => {
                            return Err(PropertyError::TypeMismatch(format!(
                                "'{}' is an invalid keyword argument",
                                key
                            )))
                        }
                    }
                }
                let v = v.ok_or_else(|| {
                    PropertyError::TypeMismatch("required argument 'value' not found".to_string())
                })?;
                self.apply_descriptor(v, lower, upper, step)
            }
            DynValue::Tuple(items) if items.len() == 4 => {
                let v = T::from_dynamic(&items[0])?;
                let lower = T::from_dynamic(&items[1])?;
                let upper = T::from_dynamic(&items[2])?;
                let step = T::from_dynamic(&items[3])?;
                self.apply_descriptor(v, lower, upper, step)
            }
            other => Err(type_error(&self.type_message(), other)),
        }
    }

    fn save(&self, writer: &mut Writer) -> Result<()> {
        self.base.save(writer)
    }

    fn restore(&mut self, reader: &mut XmlReader) -> Result<()> {
        reader.read_element(T::TAG)?;
        let value = T::read_value(reader)?;
        self.set_value(value);
        Ok(())
    }

    fn copy(&self) -> Box<dyn Property> {
        Box::new(Self {
            base: PropertyScalar::with_value(self.core().name(), self.value()),
            kind: self.kind,
            constraints: self.constraints.clone(),
        })
    }

    /// Takes both the value and the descriptor
    fn paste(&mut self, from: &dyn Property) -> Result<()> {
        let source = paste_source::<Self>(self.kind, from)?;
        self.constraints = source.constraints.clone();
        self.base.set_value(source.value());
        Ok(())
    }

    fn mem_size(&self) -> usize {
        let owned = match &self.constraints {
            Some(c) if c.is_deletable() => std::mem::size_of::<Bounds<T>>(),
            _ => 0,
        };
        self.base.mem_size() + owned
    }

    fn set_path_value(&mut self, sub_path: &str, value: &dyn Any) -> Result<()> {
        self.verify_path(sub_path)?;
        match T::from_path_value(value) {
            Some(v) => {
                self.set_value(v);
                Ok(())
            }
            None => Err(bad_cast(&self.core().full_name(), value)),
        }
    }

    fn get_path_value(&self, sub_path: &str) -> Result<Box<dyn Any + Send>> {
        self.base.get_path_value(sub_path)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::ChangeRecorder;
    use std::sync::Arc;

    #[test]
    fn test_unconstrained_bounds() {
        let cell = PropertyIntegerConstraint::new("N");
        assert_eq!(cell.minimum(), i32::MIN as i64);
        assert_eq!(cell.maximum(), i32::MAX as i64);
        assert_eq!(cell.step_size(), 1);

        let cell = PropertyFloatConstraint::new("F");
        assert_eq!(cell.minimum(), f64::MIN);
        assert_eq!(cell.maximum(), f64::MAX);
        assert_eq!(cell.step_size(), 1.0);
    }

    #[test]
    fn test_percent_clamps() {
        let mut cell = PropertyPercent::percent("Transparency");
        assert_eq!(cell.kind(), PropertyKind::Percent);
        cell.set_value(150);
        assert_eq!(cell.value(), 100);
        cell.from_dynamic(&DynValue::Int(-5)).unwrap();
        assert_eq!(cell.value(), 0);
        cell.set_path_value("", &42i32).unwrap();
        assert_eq!(cell.value(), 42);
    }

    #[test]
    fn test_clamp_holds_for_every_input() {
        let mut cell = PropertyFloatConstraint::new("F");
        cell.set_constraints(Some(Bounds::<f64>::new(-1.0, 1.0, 0.1).unwrap().into()));
        for v in [-100.0, -1.0, -0.3, 0.0, 0.7, 1.0, 55.5] {
            cell.set_value(v);
            assert!(cell.minimum() <= cell.value() && cell.value() <= cell.maximum());
        }
        cell.from_dynamic(&DynValue::Int(9)).unwrap();
        assert_eq!(cell.value(), 1.0);
        cell.from_dynamic(&DynValue::Float(f64::NAN)).unwrap();
        assert_eq!(cell.value(), -1.0);
    }

    #[test]
    fn test_dict_installs_owned_descriptor() {
        let mut cell = PropertyIntegerConstraint::new("N");
        let dict = DynValue::Dict(vec![
            ("value".into(), DynValue::Int(50)),
            ("min".into(), DynValue::Int(0)),
            ("max".into(), DynValue::Int(10)),
            ("step".into(), DynValue::Int(0)),
        ]);
        cell.from_dynamic(&dict).unwrap();
        assert_eq!(cell.value(), 10);
        assert_eq!(cell.step_size(), 1);
        assert!(cell.constraints().unwrap().is_deletable());

        let missing = DynValue::Dict(vec![("min".into(), DynValue::Int(0))]);
        assert!(cell.from_dynamic(&missing).unwrap_err().is_type_mismatch());
    }

    #[test]
    fn test_tuple_descriptor_and_bad_step() {
        let mut cell = PropertyFloatConstraint::new("F");
        let tuple = DynValue::tuple([0.5.into(), 0.0.into(), 2.0.into(), 0.25.into()]);
        cell.from_dynamic(&tuple).unwrap();
        assert_eq!(cell.value(), 0.5);
        assert_eq!(cell.maximum(), 2.0);

        let zero_step = DynValue::tuple([0.5.into(), 0.0.into(), 2.0.into(), 0.0.into()]);
        assert!(cell.from_dynamic(&zero_step).unwrap_err().is_value_rejected());

        let err = cell.from_dynamic(&DynValue::Str("x".into())).unwrap_err();
        assert_eq!(err.to_string(), "type must be float, dict or tuple, not str");
    }

    #[test]
    fn test_restore_clamps() {
        let mut cell = PropertyPercent::percent("P");
        let mut reader = XmlReader::parse("<Integer value=\"250\"/>").unwrap();
        cell.restore(&mut reader).unwrap();
        assert_eq!(cell.value(), 100);
    }

    #[test]
    fn test_precision_defaults() {
        let cell = PropertyPrecision::precision("Tol");
        assert_eq!(cell.step_size(), 0.001);
        assert_eq!(cell.minimum(), 0.0);
        assert!(!cell.constraints().unwrap().is_deletable());
    }

    #[test]
    fn test_copy_and_paste() {
        let mut source = PropertyIntegerConstraint::new("N");
        source.set_constraints(Some(Bounds::<i64>::new(0, 5, 1).unwrap().into()));
        source.set_value(4);

        let copy = source.copy();
        source.set_value(1);
        assert_eq!(copy.to_dynamic(), DynValue::Int(4));

        let recorder = Arc::new(ChangeRecorder::new("Obj"));
        let mut target = PropertyIntegerConstraint::new("T");
        target.core_mut().attach(recorder.clone());
        target.paste(copy.as_ref()).unwrap();
        assert_eq!(target.value(), 4);
        assert_eq!(target.maximum(), 5);
        assert_eq!(recorder.after_count("T"), 1);

        let percent = PropertyPercent::percent("P");
        assert!(target.paste(&percent).is_err());
    }
}
