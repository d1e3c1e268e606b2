use serde::Deserialize;

/// A request field that distinguishes "not sent" from any sent value.
///
/// Partial updates only touch the columns whose field is `Present`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MaybeAbsent<T> {
    Present(T),
    Absent,
}

impl<T> Default for MaybeAbsent<T> {
    fn default() -> Self {
        Self::Absent
    }
}

impl<T> MaybeAbsent<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    pub fn is_present(&self) -> bool {
        !self.is_absent()
    }

    pub fn as_option(&self) -> Option<&T> {
        match self {
            MaybeAbsent::Present(v) => Some(v),
            MaybeAbsent::Absent => None,
        }
    }

    pub fn if_present<'a, F>(&'a self, f: F)
    where
        F: FnOnce(&'a T),
    {
        if let MaybeAbsent::Present(v) = self {
            f(v);
        }
    }
}

impl<T> From<Option<T>> for MaybeAbsent<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => MaybeAbsent::Present(v),
            None => MaybeAbsent::Absent,
        }
    }
}
