//! Translation of stack-VM intermediate code into Hack assembly.
//!
//! Raw lines flow through [`stream::Instructions`], which parses them into
//! [`ast::Command`]s; a [`translator::Translator`] turns each command into a
//! fixed assembly fragment.

pub mod ast;
pub mod error;
pub mod parser;
pub mod stream;
pub mod translator;

#[cfg(test)]
mod hack;

pub use crate::{
    ast::{ArithmeticOp, Command, Segment},
    error::{Error, SegmentError},
    stream::{Instructions, Source},
    translator::{Options, Translator},
};

/// Translates named sources, in order, into one assembly program.
pub fn translate_units<'a, I>(units: I, options: Options) -> Result<Vec<String>, Error>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    Translator::new(options).translate(Instructions::new(Source::from_units(units)))
}
