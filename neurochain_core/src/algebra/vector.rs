use std::fmt::{self, Display};
use std::hash::{Hash, Hasher};

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::{NetworkError, NetworkResult};

/// A fixed-length vector of reals with a sparse-aware internal representation.
///
/// Callers only see one type. Internally the vector is stored as one of:
/// - a dense array,
/// - an all-zero vector without storage,
/// - a basis vector (one index holds a value, the rest are zero),
/// - a composite of sub-vectors concatenated end to end.
///
/// Arithmetic picks the cheapest representation for the result, so one-hot
/// targets and zero gradients never allocate a dense array.
///
/// Equality and hashing are element-wise and ignore the representation.
///
/// # Examples
///
/// ```
/// use neurochain_core::Vector;
///
/// let one_hot = Vector::unit(4, 2).unwrap();
/// let dense = Vector::from_vec(vec![1.0, 2.0, 3.0, 4.0]);
///
/// let sum = dense.add(&one_hot).unwrap();
/// assert_eq!(sum, Vector::from_vec(vec![1.0, 2.0, 4.0, 4.0]));
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "RawVector")]
pub struct Vector {
    repr: Repr,
}

/// Unchecked wire form; [`Vector`] is only built from it after validation.
#[derive(Deserialize)]
struct RawVector {
    repr: Repr,
}

impl TryFrom<RawVector> for Vector {
    type Error = NetworkError;

    fn try_from(raw: RawVector) -> Result<Self, Self::Error> {
        if let Repr::Basis { len, index, .. } = raw.repr {
            if index >= len {
                return Err(NetworkError::IndexOutOfRange { index, len });
            }
        }
        Ok(Self { repr: raw.repr })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
enum Repr {
    Full(Array1<f64>),
    Zero {
        len: usize,
    },
    Basis {
        len: usize,
        index: usize,
        value: f64,
    },
    Composite(Segments),
}

/// Sub-vectors of a composite plus the offset at which each one starts.
///
/// Only the parts are serialized; offsets and length are rebuilt on load.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(from = "Vec<Vector>", into = "Vec<Vector>")]
struct Segments {
    parts: Vec<Vector>,
    offsets: Vec<usize>,
    len: usize,
}

/// Read-only description of how a [`Vector`] is currently stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Representation {
    Full,
    Zero,
    Basis,
    Composite,
}

impl From<Vec<Vector>> for Segments {
    fn from(parts: Vec<Vector>) -> Self {
        Self::new(parts)
    }
}

impl From<Segments> for Vec<Vector> {
    fn from(segments: Segments) -> Self {
        segments.parts
    }
}

impl Segments {
    fn new(parts: Vec<Vector>) -> Self {
        let mut offsets = Vec::with_capacity(parts.len());
        let mut len = 0;
        for part in &parts {
            offsets.push(len);
            len += part.len();
        }
        Self {
            parts,
            offsets,
            len,
        }
    }

    /// Finds the segment owning `index` and the index relative to that segment.
    ///
    /// Zero-length segments share their offset with the next segment, so the
    /// last segment whose offset is `<= index` is always the non-empty owner.
    fn locate(&self, index: usize) -> (usize, usize) {
        let segment = self.offsets.partition_point(|&offset| offset <= index) - 1;
        (segment, index - self.offsets[segment])
    }

    fn same_signature(&self, other: &Segments) -> bool {
        self.parts.len() == other.parts.len()
            && self
                .parts
                .iter()
                .zip(other.parts.iter())
                .all(|(a, b)| a.len() == b.len())
    }
}

impl Vector {
    /// Creates a dense vector that owns `values`.
    pub fn from_vec(values: Vec<f64>) -> Self {
        Self::from_array(Array1::from_vec(values))
    }

    /// Creates a dense vector from an existing array.
    pub fn from_array(values: Array1<f64>) -> Self {
        Self {
            repr: Repr::Full(values),
        }
    }

    /// Creates an all-zero vector of length `len` without allocating storage.
    ///
    /// # Examples
    ///
    /// ```
    /// use neurochain_core::Vector;
    ///
    /// let zero = Vector::zeros(3);
    /// assert_eq!(zero.get(1).unwrap(), 0.0);
    /// ```
    pub fn zeros(len: usize) -> Self {
        Self {
            repr: Repr::Zero { len },
        }
    }

    /// Creates a basis vector: `value` at `index`, zero everywhere else.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::IndexOutOfRange`] if `index >= len`.
    pub fn basis(len: usize, index: usize, value: f64) -> NetworkResult<Self> {
        if index >= len {
            return Err(NetworkError::IndexOutOfRange { index, len });
        }
        Ok(Self::basis_unchecked(len, index, value))
    }

    /// Creates a unit vector, the basis vector with value `1.0`.
    ///
    /// This is the natural encoding of a one-hot class label.
    pub fn unit(len: usize, index: usize) -> NetworkResult<Self> {
        Self::basis(len, index, 1.0)
    }

    /// Concatenates `parts` logically, without copying their storage.
    ///
    /// The length of the result is the sum of the part lengths.
    pub fn composite(parts: Vec<Vector>) -> Self {
        Self {
            repr: Repr::Composite(Segments::new(parts)),
        }
    }

    fn basis_unchecked(len: usize, index: usize, value: f64) -> Self {
        Self {
            repr: Repr::Basis { len, index, value },
        }
    }

    pub fn len(&self) -> usize {
        match &self.repr {
            Repr::Full(values) => values.len(),
            Repr::Zero { len } | Repr::Basis { len, .. } => *len,
            Repr::Composite(segments) => segments.len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn representation(&self) -> Representation {
        match &self.repr {
            Repr::Full(_) => Representation::Full,
            Repr::Zero { .. } => Representation::Zero,
            Repr::Basis { .. } => Representation::Basis,
            Repr::Composite(_) => Representation::Composite,
        }
    }

    fn check_index(&self, index: usize) -> NetworkResult<()> {
        let len = self.len();
        if index >= len {
            return Err(NetworkError::IndexOutOfRange { index, len });
        }
        Ok(())
    }

    /// Reads the element at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::IndexOutOfRange`] if `index >= len()`.
    pub fn get(&self, index: usize) -> NetworkResult<f64> {
        self.check_index(index)?;
        Ok(self.value_at(index))
    }

    fn value_at(&self, index: usize) -> f64 {
        match &self.repr {
            Repr::Full(values) => values[index],
            Repr::Zero { .. } => 0.0,
            Repr::Basis {
                index: at, value, ..
            } => {
                if *at == index {
                    *value
                } else {
                    0.0
                }
            }
            Repr::Composite(segments) => {
                let (segment, local) = segments.locate(index);
                segments.parts[segment].value_at(local)
            }
        }
    }

    /// Writes `value` at `index`.
    ///
    /// Writes inside the stored support happen in place. A write into a sparse
    /// vector outside its support promotes the representation instead:
    /// zero becomes basis, and basis written at another index becomes dense.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::IndexOutOfRange`] if `index >= len()`.
    pub fn set_value(&mut self, index: usize, value: f64) -> NetworkResult<()> {
        self.check_index(index)?;
        let promoted = match &mut self.repr {
            Repr::Full(values) => {
                values[index] = value;
                None
            }
            Repr::Zero { len } => Some(Self::basis_unchecked(*len, index, value)),
            Repr::Basis {
                index: at,
                value: stored,
                ..
            } if *at == index => {
                *stored = value;
                None
            }
            Repr::Basis {
                len,
                index: at,
                value: stored,
            } => {
                let mut values = Array1::zeros(*len);
                values[*at] = *stored;
                values[index] = value;
                Some(Self::from_array(values))
            }
            Repr::Composite(segments) => {
                let (segment, local) = segments.locate(index);
                segments.parts[segment].set_value(local, value)?;
                None
            }
        };
        if let Some(promoted) = promoted {
            *self = promoted;
        }
        Ok(())
    }

    /// Element-wise sum.
    ///
    /// Sparse operands short-circuit: adding a zero vector returns the other
    /// operand, two basis vectors at the same index stay a basis vector, and a
    /// basis vector is folded into a copy of the other operand at its single
    /// index. Composites with matching segment lengths are added segment by
    /// segment; any other pairing is added densely.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::DimensionMismatch`] if the lengths differ.
    pub fn add(&self, other: &Vector) -> NetworkResult<Vector> {
        if self.len() != other.len() {
            return Err(NetworkError::dimension("vector add", self.len(), other.len()));
        }

        let sum = match (&self.repr, &other.repr) {
            (_, Repr::Zero { .. }) => self.clone(),
            (Repr::Zero { .. }, _) => other.clone(),
            (
                Repr::Basis {
                    len,
                    index: a_index,
                    value: a,
                },
                Repr::Basis {
                    index: b_index,
                    value: b,
                    ..
                },
            ) if a_index == b_index => Self::basis_unchecked(*len, *a_index, a + b),
            (_, Repr::Basis { index, value, .. }) => self.add_at(*index, *value),
            (Repr::Basis { .. }, _) => return other.add(self),
            (Repr::Composite(a), Repr::Composite(b)) if a.same_signature(b) => {
                let parts = a
                    .parts
                    .iter()
                    .zip(b.parts.iter())
                    .map(|(x, y)| x.add(y))
                    .collect::<NetworkResult<Vec<_>>>()?;
                Self::composite(parts)
            }
            _ => Self::from_array(self.to_array() + &other.to_array()),
        };

        Ok(sum)
    }

    /// Returns a copy with `delta` added at `index`, keeping the cheapest representation.
    fn add_at(&self, index: usize, delta: f64) -> Vector {
        match &self.repr {
            Repr::Full(values) => {
                let mut values = values.clone();
                values[index] += delta;
                Self::from_array(values)
            }
            Repr::Zero { len } => Self::basis_unchecked(*len, index, delta),
            Repr::Basis {
                len,
                index: at,
                value,
            } if *at == index => Self::basis_unchecked(*len, index, value + delta),
            Repr::Basis { .. } => {
                let mut values = self.to_array();
                values[index] += delta;
                Self::from_array(values)
            }
            Repr::Composite(segments) => {
                let (segment, local) = segments.locate(index);
                let mut parts = segments.parts.clone();
                parts[segment] = parts[segment].add_at(local, delta);
                Self::composite(parts)
            }
        }
    }

    /// Element-wise difference `self - other`.
    pub fn subtract(&self, other: &Vector) -> NetworkResult<Vector> {
        self.add(&other.scale(-1.0))
    }

    /// Multiplies every element by `factor`, preserving the representation.
    pub fn scale(&self, factor: f64) -> Vector {
        match &self.repr {
            Repr::Full(values) => Self::from_array(values * factor),
            Repr::Zero { len } => Self::zeros(*len),
            Repr::Basis { len, index, value } => {
                Self::basis_unchecked(*len, *index, value * factor)
            }
            Repr::Composite(segments) => Self::composite(
                segments
                    .parts
                    .iter()
                    .map(|part| part.scale(factor))
                    .collect(),
            ),
        }
    }

    /// Materializes a dense copy of this vector.
    pub fn to_full(&self) -> Vector {
        Self::from_array(self.to_array())
    }

    /// Copies the elements into a dense array.
    pub fn to_array(&self) -> Array1<f64> {
        match &self.repr {
            Repr::Full(values) => values.clone(),
            _ => self.iter().collect(),
        }
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.iter().collect()
    }

    /// Iterates over all `len()` elements without materializing sparse storage.
    pub fn iter(&self) -> Box<dyn Iterator<Item = f64> + '_> {
        match &self.repr {
            Repr::Full(values) => Box::new(values.iter().copied()),
            Repr::Zero { len } => Box::new(std::iter::repeat(0.0).take(*len)),
            Repr::Basis { len, index, value } => {
                let (index, value) = (*index, *value);
                Box::new((0..*len).map(move |i| if i == index { value } else { 0.0 }))
            }
            Repr::Composite(segments) => {
                Box::new(segments.parts.iter().flat_map(|part| part.iter()))
            }
        }
    }

    /// Index of the largest element, or `None` for an empty vector.
    ///
    /// Ties resolve to the lowest index.
    pub fn argmax(&self) -> Option<usize> {
        self.iter()
            .enumerate()
            .fold(None, |best: Option<(usize, f64)>, (index, value)| match best {
                Some((_, top)) if top >= value => best,
                _ => Some((index, value)),
            })
            .map(|(index, _)| index)
    }

    pub fn sum(&self) -> f64 {
        match &self.repr {
            Repr::Zero { .. } => 0.0,
            Repr::Basis { value, .. } => *value,
            _ => self.iter().sum(),
        }
    }
}

impl PartialEq for Vector {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other.iter()).all(|(a, b)| a == b)
    }
}

impl Hash for Vector {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.len().hash(state);
        for value in self.iter() {
            // -0.0 == 0.0, so both must hash alike
            let canonical = if value == 0.0 { 0.0f64 } else { value };
            canonical.to_bits().hash(state);
        }
    }
}

impl From<Vec<f64>> for Vector {
    fn from(values: Vec<f64>) -> Self {
        Self::from_vec(values)
    }
}

impl Display for Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, value) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{value}")?;
        }
        write!(f, "]")
    }
}
