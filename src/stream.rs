//! Turns raw source lines into commands, one unit at a time.

use crate::{ast::Command, error::Error, parser::parse_line};

/// One item of raw input.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Source<'a> {
    /// A new source file starts here.
    Unit(&'a str),
    Line(&'a str),
}

impl<'a> Source<'a> {
    /// Lays out several named sources as one stream, a unit marker before each.
    pub fn from_units<I>(units: I) -> Vec<Source<'a>>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut items = vec![];
        for (name, text) in units {
            items.push(Source::Unit(name));
            items.extend(text.lines().map(Source::Line));
        }
        items
    }
}

/// Strips a trailing `//` comment and surrounding whitespace.
fn code_part(line: &str) -> &str {
    line.split_once("//").map(|(s, _)| s).unwrap_or(line).trim()
}

/// Iterator of commands over a [`Source`] stream.
///
/// Blank and comment-only lines are skipped. Errors carry the unit name and
/// the 1-based line number within that unit.
pub struct Instructions<'a, I> {
    items: I,
    unit: &'a str,
    line_no: usize,
}

impl<'a, I> Instructions<'a, I>
where
    I: Iterator<Item = Source<'a>>,
{
    pub fn new<T>(items: T) -> Self
    where
        T: IntoIterator<IntoIter = I>,
    {
        Instructions {
            items: items.into_iter(),
            unit: "<input>",
            line_no: 0,
        }
    }
}

impl<'a, I> Iterator for Instructions<'a, I>
where
    I: Iterator<Item = Source<'a>>,
{
    type Item = Result<Command, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.items.next()? {
                Source::Unit(name) => {
                    self.unit = name;
                    self.line_no = 0;
                    return Some(Ok(Command::NewUnit(name.to_string())));
                }
                Source::Line(raw) => {
                    self.line_no += 1;
                    let line = code_part(raw);
                    if line.is_empty() {
                        continue;
                    }
                    return Some(parse_line(line).map_err(|source| Error::At {
                        unit: self.unit.to_string(),
                        line_no: self.line_no,
                        source: Box::new(source),
                    }));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ArithmeticOp, Segment};

    #[test]
    fn skips_blank_and_comment_lines() {
        let text = "// File name: SimpleAdd.vm\n\n   \n\
                    push constant 7 // seven\npush constant 8\nadd\n";
        let commands: Result<Vec<_>, _> =
            Instructions::new(Source::from_units([("SimpleAdd", text)])).collect();
        assert_eq!(
            commands.unwrap(),
            vec![
                Command::NewUnit("SimpleAdd".to_string()),
                Command::Push(Segment::Constant, 7),
                Command::Push(Segment::Constant, 8),
                Command::Arithmetic(ArithmeticOp::Add),
            ]
        );
    }

    #[test]
    fn marks_every_unit() {
        let items = Source::from_units([("A", "push static 0"), ("B", ""), ("C", "pop static 1")]);
        let units: Vec<_> = Instructions::new(items)
            .filter_map(|c| match c {
                Ok(Command::NewUnit(name)) => Some(name),
                _ => None,
            })
            .collect();
        assert_eq!(units, vec!["A", "B", "C"]);
    }

    #[test]
    fn errors_name_unit_and_line() {
        let items = Source::from_units([("Good", "push constant 1"), ("Bad", "\n// x\nxyz 1 2")]);
        let err = Instructions::new(items)
            .collect::<Result<Vec<_>, _>>()
            .unwrap_err();
        match &err {
            Error::At { unit, line_no, .. } => {
                assert_eq!(unit, "Bad");
                assert_eq!(*line_no, 3);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(err.root(), Error::Parse { line, .. } if line == "xyz 1 2"));
        assert_eq!(
            err.to_string(),
            "Bad:3: invalid command `xyz 1 2`: unknown command `xyz`"
        );
    }

    #[test]
    fn bare_lines_need_no_marker() {
        let items = vec![Source::Line("neg"), Source::Line("not")];
        assert_eq!(Instructions::new(items).count(), 2);
    }
}
