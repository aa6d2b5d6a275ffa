//! Structural shape descriptions for cached types
//!
//! A shape is a canonical string describing the serializable layout of a type:
//! its name, its fields in declaration order and, recursively, the shapes of
//! the field types. Any edit an engineer makes to a model (adding, removing,
//! renaming or retyping a field, anywhere in the object graph) changes the
//! string, and therefore the [`Fingerprint`](crate::Fingerprint) derived from it.
//!
//! Structs and enums get their implementation from `#[derive(CacheValue)]`;
//! this module provides the writer and the implementations for std types.

use std::any::TypeId;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::rc::Rc;
use std::sync::Arc;

/// Types whose serializable layout can be described
pub trait Shape {
    /// Append this type's shape to the writer
    fn describe(w: &mut ShapeWriter);
}

/// Accumulates a canonical shape string
///
/// Named types are tracked by `TypeId` while they are being described, so a
/// recursive type (`struct Node { children: Vec<Node> }`) emits a
/// back-reference instead of recursing forever. Distinct types that share a
/// name are described in full.
#[derive(Debug, Default)]
pub struct ShapeWriter {
    out: String,
    open: Vec<TypeId>,
}

impl ShapeWriter {
    /// Create an empty writer
    pub fn new() -> Self {
        Self::default()
    }

    /// Describe `T` from scratch and return its shape string
    pub fn shape_of<T: Shape + ?Sized>() -> String {
        let mut w = Self::new();
        T::describe(&mut w);
        w.finish()
    }

    /// Write a leaf type
    pub fn primitive(&mut self, name: &str) {
        self.out.push_str(name);
    }

    /// Open the named struct or enum `T`
    ///
    /// Returns `false` when `T` itself is already open; a back-reference has
    /// been written and the caller must not describe the body.
    pub fn enter<T: ?Sized + 'static>(&mut self, name: &str) -> bool {
        let id = TypeId::of::<T>();
        if self.open.contains(&id) {
            self.out.push('^');
            self.out.push_str(name);
            return false;
        }
        self.open.push(id);
        self.out.push_str(name);
        self.out.push('{');
        true
    }

    /// Close the innermost named type
    pub fn leave(&mut self) {
        self.open.pop();
        self.out.push('}');
    }

    /// Start a field; the next description is the field's type
    pub fn field(&mut self, name: &str) {
        self.out.push_str(name);
        self.out.push(':');
    }

    /// Start an enum variant
    pub fn variant(&mut self, name: &str) {
        self.out.push('|');
        self.out.push_str(name);
    }

    /// Separate two fields or type arguments
    pub fn next(&mut self) {
        self.out.push(',');
    }

    /// Write a generic container with its arguments
    pub fn generic(&mut self, name: &str, args: impl FnOnce(&mut ShapeWriter)) {
        self.out.push_str(name);
        self.out.push('<');
        args(self);
        self.out.push('>');
    }

    /// Consume the writer
    pub fn finish(self) -> String {
        self.out
    }
}

macro_rules! primitive_shape {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl Shape for $ty {
                fn describe(w: &mut ShapeWriter) {
                    w.primitive($name);
                }
            }
        )*
    };
}

primitive_shape! {
    bool => "bool",
    char => "char",
    i8 => "i8",
    i16 => "i16",
    i32 => "i32",
    i64 => "i64",
    i128 => "i128",
    isize => "isize",
    u8 => "u8",
    u16 => "u16",
    u32 => "u32",
    u64 => "u64",
    u128 => "u128",
    usize => "usize",
    f32 => "f32",
    f64 => "f64",
    String => "str",
    str => "str",
    () => "unit",
}

impl<T: Shape> Shape for Option<T> {
    fn describe(w: &mut ShapeWriter) {
        w.generic("Option", T::describe);
    }
}

// Sequences and sets share one shape: they serialize identically.
macro_rules! seq_shape {
    ($($ty:ident),*) => {
        $(
            impl<T: Shape> Shape for $ty<T> {
                fn describe(w: &mut ShapeWriter) {
                    w.generic("Seq", T::describe);
                }
            }
        )*
    };
}

seq_shape!(Vec, VecDeque, BTreeSet);

impl<T: Shape, H> Shape for HashSet<T, H> {
    fn describe(w: &mut ShapeWriter) {
        w.generic("Seq", T::describe);
    }
}

impl<T: Shape> Shape for [T] {
    fn describe(w: &mut ShapeWriter) {
        w.generic("Seq", T::describe);
    }
}

impl<K: Shape, V: Shape> Shape for BTreeMap<K, V> {
    fn describe(w: &mut ShapeWriter) {
        w.generic("Map", |w| {
            K::describe(w);
            w.next();
            V::describe(w);
        });
    }
}

impl<K: Shape, V: Shape, H> Shape for HashMap<K, V, H> {
    fn describe(w: &mut ShapeWriter) {
        w.generic("Map", |w| {
            K::describe(w);
            w.next();
            V::describe(w);
        });
    }
}

// Smart pointers are transparent to serde.
macro_rules! transparent_shape {
    ($($ty:ident),*) => {
        $(
            impl<T: Shape + ?Sized> Shape for $ty<T> {
                fn describe(w: &mut ShapeWriter) {
                    T::describe(w);
                }
            }
        )*
    };
}

transparent_shape!(Box, Arc, Rc);

macro_rules! tuple_shape {
    ($first:ident $(, $rest:ident)*) => {
        impl<$first: Shape $(, $rest: Shape)*> Shape for ($first, $($rest,)*) {
            fn describe(w: &mut ShapeWriter) {
                w.generic("Tuple", |w| {
                    $first::describe(w);
                    $(
                        w.next();
                        $rest::describe(w);
                    )*
                });
            }
        }
    };
}

tuple_shape!(A);
tuple_shape!(A, B);
tuple_shape!(A, B, C);
tuple_shape!(A, B, C, D);
