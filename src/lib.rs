//! A compiler backend that lowers a typed, three-address style intermediate
//! representation of a single class into textual Jasmin stack-machine
//! assembly.
//!
//! The input ([`ir::ClassUnit`]) arrives fully resolved from an upstream
//! pass: types assigned, variable slots assigned, labels attached to branch
//! targets. The backend selects minimal-width constant loads, lowers
//! structured boolean conditions into compare-and-jump sequences, dispatches
//! the invocation forms, and computes the `.limit stack`/`.limit locals`
//! declarations by exact simulation of the emitted instruction stream.
//!
//! ```rust
//! use jasmin_codegen::ir::ClassUnit;
//!
//! let unit = ClassUnit {
//!     name: "Hello".into(),
//!     super_name: None,
//!     fields: Vec::new(),
//!     methods: Vec::new(),
//!     imports: Default::default(),
//! };
//! let code = jasmin_codegen::generate_class(&unit).unwrap();
//! assert!(code.starts_with(".class public Hello"));
//! ```

pub mod backend;
pub mod ir;

pub use backend::{generate_class, GenError};
