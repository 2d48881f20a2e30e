#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ListOpKind {
    Ins,
    Del,
}

/// A single list edit. `pos` is a zero-based index into the items visible at
/// the moment the operation was created.
///
/// The content type is fully opaque to the engine; it is only ever moved or
/// cloned, never compared.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ListOp<T> {
    Ins { pos: usize, content: T },
    Del { pos: usize },
}

impl<T> ListOp<T> {
    pub fn insert(pos: usize, content: T) -> Self {
        ListOp::Ins { pos, content }
    }

    pub fn delete(pos: usize) -> Self {
        ListOp::Del { pos }
    }

    pub fn kind(&self) -> ListOpKind {
        match self {
            ListOp::Ins { .. } => ListOpKind::Ins,
            ListOp::Del { .. } => ListOpKind::Del,
        }
    }

    pub fn pos(&self) -> usize {
        match self {
            ListOp::Ins { pos, .. } | ListOp::Del { pos } => *pos,
        }
    }

    pub fn content(&self) -> Option<&T> {
        match self {
            ListOp::Ins { content, .. } => Some(content),
            ListOp::Del { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors() {
        let ins = ListOp::insert(3, 'x');
        assert_eq!(ins.kind(), ListOpKind::Ins);
        assert_eq!(ins.pos(), 3);
        assert_eq!(ins.content(), Some(&'x'));

        let del: ListOp<char> = ListOp::delete(0);
        assert_eq!(del.kind(), ListOpKind::Del);
        assert_eq!(del.pos(), 0);
        assert_eq!(del.content(), None);
    }
}
