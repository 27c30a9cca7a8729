// SPDX-License-Identifier: MIT
// Copyright (c) 2023 Kagati Foundation

use std::fmt::Display;
use std::rc::Rc;

use indexmap::IndexMap;

use pgl_errors::CompileError;

/// Classification flags of a type. Stored as a bitset so combined
/// queries (signed integer, real, ...) stay one mask test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeFlags(u16);

impl TypeFlags {
    pub const NONE: TypeFlags = TypeFlags(0);
    pub const NUMERIC: TypeFlags = TypeFlags(1);
    pub const INTEGER: TypeFlags = TypeFlags(1 << 1);
    pub const REAL: TypeFlags = TypeFlags(1 << 2);
    pub const VALUE: TypeFlags = TypeFlags(1 << 3);
    pub const REFERENCE: TypeFlags = TypeFlags(1 << 4);
    pub const SIGNED: TypeFlags = TypeFlags(1 << 5);

    pub fn contains(&self, other: TypeFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for TypeFlags {
    type Output = TypeFlags;

    fn bitor(self, rhs: TypeFlags) -> TypeFlags {
        TypeFlags(self.0 | rhs.0)
    }
}

#[derive(Debug)]
pub struct TypeInfo {
    name: String,
    byte_size: usize,
    flags: TypeFlags,
}

/// Handle to a registered type. Cloning is cheap, and equality is
/// identity of the registered instance, never name comparison: two
/// handles are equal iff they came from the same registry entry.
#[derive(Debug, Clone)]
pub struct PglType(Rc<TypeInfo>);

impl PglType {
    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn byte_size(&self) -> usize {
        self.0.byte_size
    }

    pub fn flags(&self) -> TypeFlags {
        self.0.flags
    }

    pub fn is_integer(&self) -> bool {
        self.0.flags.contains(TypeFlags::INTEGER)
    }

    pub fn is_signed_integer(&self) -> bool {
        self.0.flags.contains(TypeFlags::INTEGER | TypeFlags::SIGNED)
    }

    pub fn is_real(&self) -> bool {
        self.0.flags.contains(TypeFlags::REAL)
    }
}

impl PartialEq for PglType {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for PglType {}

impl Display for PglType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.name)
    }
}

/// Interns one `PglType` per name. All primitives are pre-registered
/// at construction; `int`/`uint`/`float` take the target platform's
/// word size. Immutable afterwards except through `register`.
pub struct TypeRegistry {
    types: IndexMap<String, PglType>,
    word_size: usize,
}

impl TypeRegistry {
    pub fn new(word_size: usize) -> Self {
        let mut registry = Self {
            types: IndexMap::new(),
            word_size,
        };

        let int_flags = TypeFlags::NUMERIC | TypeFlags::INTEGER | TypeFlags::SIGNED | TypeFlags::VALUE;
        let uint_flags = TypeFlags::NUMERIC | TypeFlags::INTEGER | TypeFlags::VALUE;
        let real_flags = TypeFlags::NUMERIC | TypeFlags::REAL | TypeFlags::VALUE;

        registry.preregister("int", word_size, int_flags);
        registry.preregister("i8", 1, int_flags);
        registry.preregister("i16", 2, int_flags);
        registry.preregister("i32", 4, int_flags);
        registry.preregister("i64", 8, int_flags);

        registry.preregister("uint", word_size, uint_flags);
        registry.preregister("u8", 1, uint_flags);
        registry.preregister("u16", 2, uint_flags);
        registry.preregister("u32", 4, uint_flags);
        registry.preregister("u64", 8, uint_flags);

        registry.preregister("float", word_size, real_flags);
        registry.preregister("f32", 4, real_flags);
        registry.preregister("f64", 8, real_flags);

        registry.preregister("bool", 1, TypeFlags::VALUE);
        registry
    }

    pub fn word_size(&self) -> usize {
        self.word_size
    }

    fn preregister(&mut self, name: &str, byte_size: usize, flags: TypeFlags) {
        let ty = PglType(Rc::new(TypeInfo {
            name: name.to_string(),
            byte_size,
            flags,
        }));
        self.types.insert(name.to_string(), ty);
    }

    pub fn register(
        &mut self,
        name: &str,
        byte_size: usize,
        flags: TypeFlags,
    ) -> Result<PglType, CompileError> {
        if self.types.contains_key(name) {
            return Err(CompileError::DuplicateSymbol {
                name: name.to_string(),
            });
        }
        let ty = PglType(Rc::new(TypeInfo {
            name: name.to_string(),
            byte_size,
            flags,
        }));
        self.types.insert(name.to_string(), ty.clone());
        Ok(ty)
    }

    pub fn lookup(&self, name: &str) -> Result<PglType, CompileError> {
        self.types
            .get(name)
            .cloned()
            .ok_or_else(|| CompileError::UnknownType {
                name: name.to_string(),
            })
    }
}
