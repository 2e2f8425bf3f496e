//! Predicates and defaults for field-level serde attributes. Fields equal to
//! their default are left out of world files.

#![allow(clippy::trivially_copy_pass_by_ref)]

use portalis_core::Entity;

pub(crate) fn is_null(e: &Entity) -> bool {
    e.is_null()
}

pub(crate) fn is_false(b: &bool) -> bool {
    !*b
}

pub(crate) fn is_true(b: &bool) -> bool {
    *b
}

pub(crate) const fn default_true() -> bool {
    true
}

pub(crate) fn is_zero(v: &f64) -> bool {
    *v == 0.0
}

pub(crate) fn is_zero_i32(v: &i32) -> bool {
    *v == 0
}
