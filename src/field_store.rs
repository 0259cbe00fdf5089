use std::collections::HashMap;
use std::fmt;
use crate::error::{Error, Result};
use crate::index_space::IndexSpace;
use crate::patch::CellField;




/**
 * Names of the cell-centered variables exchanged with the field store.
 */
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Label {
    Temperature,
    Abskg,
    SigmaT4OverPi,
    CellType,
    DivQ,
    RadiationVolq,
}

impl fmt::Display for Label {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Label::Temperature   => "temperature",
            Label::Abskg         => "abskg",
            Label::SigmaT4OverPi => "sigmaT4OverPi",
            Label::CellType      => "cellType",
            Label::DivQ          => "divQ",
            Label::RadiationVolq => "radiationVolq",
        };
        write!(fmt, "{}", name)
    }
}




/**
 * Whether a kernel reads or writes a variable
 */
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Requires,
    Computes,
}




/**
 * Which phase's data a requirement refers to: values written by the
 * previous phase, or by an earlier kernel of the current phase.
 */
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Generation {
    Old,
    New,
}




/**
 * How far beyond the patch interior a kernel reads a variable.
 */
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ghost {
    None,
    Cells(i64),
    EntireLevel,
}




/**
 * A declaration of one data dependency of a kernel. An external scheduler
 * uses these to order kernel invocations and materialize ghost data; nothing
 * in this crate executes them.
 */
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dependency {
    pub access: Access,
    pub label: Label,
    pub generation: Generation,
    pub level: usize,
    pub ghost: Ghost,
}

impl Dependency {
    pub fn requires(label: Label, generation: Generation, level: usize, ghost: Ghost) -> Self {
        Self { access: Access::Requires, label, generation, level, ghost }
    }

    pub fn computes(label: Label, level: usize) -> Self {
        Self { access: Access::Computes, label, generation: Generation::New, level, ghost: Ghost::None }
    }
}




/**
 * Type-erased storage for a field. Cell types are integer codes; all other
 * variables are doubles.
 */
#[derive(Clone, Debug)]
pub enum Stored {
    Double(CellField<f64>),
    Int(CellField<i32>),
}

impl Stored {
    fn index_space(&self) -> &IndexSpace {
        match self {
            Stored::Double(f) => f.index_space(),
            Stored::Int(f) => f.index_space(),
        }
    }
}




/**
 * Value types which can be held in a field store.
 */
pub trait StoredValue: Copy + Sized {
    fn wrap(field: CellField<Self>) -> Stored;
    fn unwrap_ref(stored: &Stored) -> Option<&CellField<Self>>;
    fn unwrap_mut(stored: &mut Stored) -> Option<&mut CellField<Self>>;
}

impl StoredValue for f64 {
    fn wrap(field: CellField<Self>) -> Stored {
        Stored::Double(field)
    }
    fn unwrap_ref(stored: &Stored) -> Option<&CellField<Self>> {
        match stored {
            Stored::Double(f) => Some(f),
            _ => None,
        }
    }
    fn unwrap_mut(stored: &mut Stored) -> Option<&mut CellField<Self>> {
        match stored {
            Stored::Double(f) => Some(f),
            _ => None,
        }
    }
}

impl StoredValue for i32 {
    fn wrap(field: CellField<Self>) -> Stored {
        Stored::Int(field)
    }
    fn unwrap_ref(stored: &Stored) -> Option<&CellField<Self>> {
        match stored {
            Stored::Int(f) => Some(f),
            _ => None,
        }
    }
    fn unwrap_mut(stored: &mut Stored) -> Option<&mut CellField<Self>> {
        match stored {
            Stored::Int(f) => Some(f),
            _ => None,
        }
    }
}




/**
 * Interface to the structured field store. Reads return views which are
 * guaranteed (by the store, not the caller) to reflect fully written values
 * from the previous phase. Writes hand out an exclusive array for the current
 * phase; writing an overlapping region twice is a caller bug and is reported
 * as an error.
 */
pub trait FieldStore {

    /// Return a read-only view of a variable covering at least `region`
    /// (which may include ghost cells).
    fn get<T: StoredValue>(&self, label: Label, level: usize, region: &IndexSpace) -> Result<&CellField<T>>;

    /// Allocate a variable over `region`, initialized to `initial`, and
    /// return a writable view of it.
    fn allocate_and_put<T: StoredValue>(&mut self, label: Label, level: usize, region: IndexSpace, initial: T) -> Result<&mut CellField<T>>;

    /// Transfer ownership of a fully computed variable into the store.
    fn put<T: StoredValue>(&mut self, label: Label, level: usize, field: CellField<T>) -> Result<()>;
}




/**
 * An in-memory field store for one phase ("generation") of a computation.
 * Each label on each level may hold several arrays (for example one per
 * patch), provided they do not overlap.
 */
#[derive(Clone, Debug, Default)]
pub struct DataWarehouse {
    fields: HashMap<(Label, usize), Vec<Stored>>,
}




// ============================================================================
impl DataWarehouse {

    pub fn new() -> Self {
        Self::default()
    }

    /**
     * Determine whether any array for this label exists on the level.
     */
    pub fn exists(&self, label: Label, level: usize) -> bool {
        self.fields.get(&(label, level)).map_or(false, |v| !v.is_empty())
    }

    fn check_disjoint(&self, label: Label, level: usize, region: &IndexSpace) -> Result<()> {
        let existing = self.fields.get(&(label, level));

        if existing.map_or(false, |v| v.iter().any(|s| s.index_space().overlaps(region))) {
            Err(Error::FieldAlreadyPut { label, level })
        } else {
            Ok(())
        }
    }
}




// ============================================================================
impl FieldStore for DataWarehouse {

    fn get<T: StoredValue>(&self, label: Label, level: usize, region: &IndexSpace) -> Result<&CellField<T>> {
        let stored = self.fields
            .get(&(label, level))
            .filter(|v| !v.is_empty())
            .ok_or(Error::MissingField { label, level })?;

        let covering = stored
            .iter()
            .find(|s| s.index_space().contains_space(region))
            .ok_or(Error::FieldNotCovered {
                label,
                level,
                start: region.start(),
                end: region.end(),
            })?;

        T::unwrap_ref(covering).ok_or(Error::FieldTypeMismatch { label, level })
    }

    fn allocate_and_put<T: StoredValue>(&mut self, label: Label, level: usize, region: IndexSpace, initial: T) -> Result<&mut CellField<T>> {
        self.check_disjoint(label, level, &region)?;

        let slot = self.fields.entry((label, level)).or_default();
        slot.push(T::wrap(CellField::filled(region, initial)));

        slot.last_mut()
            .and_then(T::unwrap_mut)
            .ok_or(Error::FieldTypeMismatch { label, level })
    }

    fn put<T: StoredValue>(&mut self, label: Label, level: usize, field: CellField<T>) -> Result<()> {
        self.check_disjoint(label, level, field.index_space())?;
        self.fields.entry((label, level)).or_default().push(T::wrap(field));
        Ok(())
    }
}
