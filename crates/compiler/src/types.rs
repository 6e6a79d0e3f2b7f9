use std::fmt;

/// The coarse classification deciding which virtual-machine stack an operand
/// lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StackType {
    Int,
    Long,
    String,
}

/// A language-level primitive type: a spelling usable in source, a stack
/// type, and serializer metadata for the config writer.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Int,
    Bool,
    Long,
    String,
    Type,
    CoordGrid,
    Graphic,
    Obj,
    Param,
}

impl PrimitiveType {
    pub const ALL: &'static [PrimitiveType] = &[
        PrimitiveType::Int,
        PrimitiveType::Bool,
        PrimitiveType::Long,
        PrimitiveType::String,
        PrimitiveType::Type,
        PrimitiveType::CoordGrid,
        PrimitiveType::Graphic,
        PrimitiveType::Obj,
        PrimitiveType::Param,
    ];

    /// The source spelling, as it appears in type literals and `def_<type>`.
    pub fn representation(self) -> &'static str {
        match self {
            PrimitiveType::Int => "int",
            PrimitiveType::Bool => "bool",
            PrimitiveType::Long => "long",
            PrimitiveType::String => "string",
            PrimitiveType::Type => "type",
            PrimitiveType::CoordGrid => "coord",
            PrimitiveType::Graphic => "graphic",
            PrimitiveType::Obj => "obj",
            PrimitiveType::Param => "param",
        }
    }

    pub fn from_representation(text: &str) -> Option<PrimitiveType> {
        Self::ALL
            .iter()
            .copied()
            .find(|ty| ty.representation() == text)
    }

    pub fn stack_type(self) -> StackType {
        match self {
            PrimitiveType::Long => StackType::Long,
            PrimitiveType::String => StackType::String,
            _ => StackType::Int,
        }
    }

    /// Whether `def_<representation>` declares a local of this type.
    pub fn is_declarable(self) -> bool {
        !matches!(self, PrimitiveType::Type | PrimitiveType::Param)
    }

    /// The config group this type's values are drawn from, when the type is
    /// a reference to a configuration entry.
    pub fn config_group(self) -> Option<&'static str> {
        match self {
            PrimitiveType::Obj => Some("obj"),
            PrimitiveType::Param => Some("param"),
            PrimitiveType::Graphic => Some("graphic"),
            _ => None,
        }
    }

    /// Stable one-byte id used when a type literal is serialized.
    pub fn type_id(self) -> u8 {
        self as u8
    }

    pub fn from_type_id(id: u8) -> Option<PrimitiveType> {
        Self::ALL.get(id as usize).copied()
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.representation())
    }
}

/// An expression-level type. Tuples are kept flat: nesting collapses at
/// construction, and a one-element tuple is indistinguishable from the
/// element itself. `Error` poisons downstream checks without cascading
/// diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Prim(PrimitiveType),
    Tuple(Vec<PrimitiveType>),
    Error,
}

impl Type {
    pub const VOID: Type = Type::Tuple(Vec::new());

    pub fn of(prim: PrimitiveType) -> Type {
        Type::Prim(prim)
    }

    /// Builds a tuple from already-typed parts, flattening as it goes.
    pub fn tuple(parts: impl IntoIterator<Item = Type>) -> Type {
        let mut flat = Vec::new();
        for part in parts {
            match part {
                Type::Prim(prim) => flat.push(prim),
                Type::Tuple(prims) => flat.extend(prims),
                Type::Error => return Type::Error,
            }
        }
        Type::from_flat(flat)
    }

    pub fn from_prims(prims: impl IntoIterator<Item = PrimitiveType>) -> Type {
        Type::from_flat(prims.into_iter().collect())
    }

    fn from_flat(mut flat: Vec<PrimitiveType>) -> Type {
        if flat.len() == 1 {
            Type::Prim(flat.remove(0))
        } else {
            Type::Tuple(flat)
        }
    }

    /// The canonical flattened component list.
    pub fn flattened(&self) -> &[PrimitiveType] {
        match self {
            Type::Prim(prim) => std::slice::from_ref(prim),
            Type::Tuple(prims) => prims,
            Type::Error => &[],
        }
    }

    /// The single primitive this type is, if it is not a wider tuple.
    pub fn as_prim(&self) -> Option<PrimitiveType> {
        match self {
            Type::Prim(prim) => Some(*prim),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Type::Error)
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Tuple(prims) if prims.is_empty())
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Prim(prim) => prim.fmt(f),
            Type::Tuple(prims) if prims.is_empty() => f.write_str("void"),
            Type::Tuple(prims) => {
                f.write_str("(")?;
                for (index, prim) in prims.iter().enumerate() {
                    if index > 0 {
                        f.write_str(",")?;
                    }
                    prim.fmt(f)?;
                }
                f.write_str(")")
            }
            Type::Error => f.write_str("<error>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tuple_of_one_collapses() {
        assert_eq!(
            Type::tuple([Type::of(PrimitiveType::Int)]),
            Type::Prim(PrimitiveType::Int)
        );
    }

    #[test]
    fn nested_tuples_flatten() {
        let inner = Type::from_prims([PrimitiveType::Int, PrimitiveType::String]);
        let outer = Type::tuple([Type::of(PrimitiveType::Long), inner]);
        assert_eq!(
            outer.flattened(),
            &[
                PrimitiveType::Long,
                PrimitiveType::Int,
                PrimitiveType::String
            ]
        );
    }

    #[test]
    fn empty_tuple_is_void() {
        assert!(Type::tuple([]).is_void());
        assert_eq!(Type::tuple([]).to_string(), "void");
    }

    #[test]
    fn representations_round_trip() {
        for prim in PrimitiveType::ALL {
            assert_eq!(
                PrimitiveType::from_representation(prim.representation()),
                Some(*prim)
            );
            assert_eq!(PrimitiveType::from_type_id(prim.type_id()), Some(*prim));
        }
    }

    #[test]
    fn stack_classification() {
        assert_eq!(PrimitiveType::Obj.stack_type(), StackType::Int);
        assert_eq!(PrimitiveType::Long.stack_type(), StackType::Long);
        assert_eq!(PrimitiveType::String.stack_type(), StackType::String);
    }
}
