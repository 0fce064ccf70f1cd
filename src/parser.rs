use nom::{
    bytes::complete::{is_a, is_not},
    character::{
        complete::{alpha1, digit1, space1},
        is_digit,
    },
    combinator::{map, map_res, verify},
    sequence::{preceded, tuple},
    IResult,
};

use crate::{
    ast::{ArithmeticOp, Command, Segment, RESERVED_PREFIX},
    error::Error,
};

fn keyword(input: &str) -> IResult<&str, &str> {
    is_not(" \t")(input)
}

fn integer(input: &str) -> IResult<&str, u16> {
    map_res(digit1, |c: &str| c.parse())(input)
}

#[test]
fn test_integer() {
    assert_eq!(integer("32 rest"), Ok((" rest", 32)));
    assert!(integer("65536").is_err());
    assert!(integer("-1").is_err());
}

fn symbol(input: &str) -> IResult<&str, String> {
    map(
        verify(
            is_a("abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ_.$:0123456789"),
            |c: &str| !is_digit(c.as_bytes()[0]),
        ),
        |sym: &str| sym.to_string(),
    )(input)
}

#[test]
fn test_symbol() {
    assert_eq!(
        symbol("Main.fibonacci$LOOP_1"),
        Ok(("", "Main.fibonacci$LOOP_1".to_string()))
    );
    assert!(symbol("1abc").is_err());
}

/// Segment name and index, each preceded by whitespace.
fn access(input: &str) -> IResult<&str, (&str, u16)> {
    tuple((preceded(space1, alpha1), preceded(space1, integer)))(input)
}

/// Symbol and count, as in `function` and `call`.
fn named_count(input: &str) -> IResult<&str, (String, u16)> {
    tuple((preceded(space1, symbol), preceded(space1, integer)))(input)
}

fn unreserved(line: &str, sym: String) -> Result<String, Error> {
    if sym.starts_with(RESERVED_PREFIX) {
        return Err(Error::parse(
            line,
            format!("names starting with `{}` are reserved", RESERVED_PREFIX),
        ));
    }
    Ok(sym)
}

fn memory<'a>(line: &str, kw: &str, rest: &'a str) -> Result<(Command, &'a str), Error> {
    let (remainder, (seg, index)) = access(rest)
        .map_err(|_| Error::parse(line, format!("expected `{} <segment> <index>`", kw)))?;
    let segment: Segment = seg.parse().map_err(|source| Error::Segment {
        line: line.to_string(),
        source,
    })?;
    let built = if kw == "push" {
        Command::push(segment, index)
    } else {
        Command::pop(segment, index)
    };
    let command = built.map_err(|source| Error::Segment {
        line: line.to_string(),
        source,
    })?;
    Ok((command, remainder))
}

fn branching<'a>(line: &str, kw: &str, rest: &'a str) -> Result<(Command, &'a str), Error> {
    let (remainder, sym) = preceded(space1, symbol)(rest)
        .map_err(|_| Error::parse(line, format!("expected `{} <label>`", kw)))?;
    let sym = unreserved(line, sym)?;
    let command = match kw {
        "label" => Command::Label(sym),
        "goto" => Command::Goto(sym),
        _ => Command::IfGoto(sym),
    };
    Ok((command, remainder))
}

fn function<'a>(line: &str, kw: &str, rest: &'a str) -> Result<(Command, &'a str), Error> {
    let what = if kw == "function" { "locals" } else { "args" };
    let (remainder, (name, count)) = named_count(rest)
        .map_err(|_| Error::parse(line, format!("expected `{} <name> <n{}>`", kw, what)))?;
    let name = unreserved(line, name)?;
    let command = if kw == "function" {
        Command::Function(name, count)
    } else {
        Command::Call(name, count)
    };
    Ok((command, remainder))
}

/// Parses one trimmed, non-empty line with comments already removed.
pub fn parse_line(line: &str) -> Result<Command, Error> {
    let (rest, kw) = keyword(line).map_err(|_| Error::parse(line, "empty command"))?;

    let (command, tail) = if let Ok(op) = kw.parse::<ArithmeticOp>() {
        (Command::Arithmetic(op), rest)
    } else {
        match kw {
            "push" | "pop" => memory(line, kw, rest)?,
            "label" | "goto" | "if-goto" => branching(line, kw, rest)?,
            "function" | "call" => function(line, kw, rest)?,
            "return" => (Command::Return, rest),
            _ => return Err(Error::parse(line, format!("unknown command `{}`", kw))),
        }
    };

    let extra = tail.trim_start();
    if !extra.is_empty() {
        return Err(Error::parse(line, format!("unexpected `{}`", extra)));
    }

    Ok(command)
}

#[test]
fn test_push() {
    assert_eq!(
        parse_line("push  pointer  1"),
        Ok(Command::Push(Segment::Pointer, 1))
    );
    assert_eq!(
        parse_line("push\tconstant 17"),
        Ok(Command::Push(Segment::Constant, 17))
    );
}

#[test]
fn test_prim() {
    assert_eq!(
        parse_line("neg"),
        Ok(Command::Arithmetic(ArithmeticOp::Neg))
    );
    assert!(matches!(parse_line("neg 1"), Err(Error::Parse { .. })));
    assert!(matches!(parse_line("negate"), Err(Error::Parse { .. })));
}

#[test]
fn test_pop_constant_is_segment_error() {
    match parse_line("pop constant 0") {
        Err(Error::Segment { line, source }) => {
            assert_eq!(line, "pop constant 0");
            assert_eq!(source, crate::error::SegmentError::PopConstant);
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_unknown_segment() {
    assert!(matches!(
        parse_line("push heap 2"),
        Err(Error::Segment {
            source: crate::error::SegmentError::Unknown(_),
            ..
        })
    ));
}

#[test]
fn test_unknown_command() {
    match parse_line("xyz 1 2") {
        Err(Error::Parse { line, .. }) => assert_eq!(line, "xyz 1 2"),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_operand_shape() {
    assert!(matches!(parse_line("push local"), Err(Error::Parse { .. })));
    assert!(matches!(parse_line("push local x"), Err(Error::Parse { .. })));
    assert!(matches!(parse_line("pop temp 1 2"), Err(Error::Parse { .. })));
    assert!(matches!(parse_line("goto"), Err(Error::Parse { .. })));
    assert!(matches!(parse_line("call Foo.bar"), Err(Error::Parse { .. })));
    assert!(matches!(parse_line("return now"), Err(Error::Parse { .. })));
}

#[test]
fn test_branching() {
    assert_eq!(
        parse_line("if-goto LOOP_START"),
        Ok(Command::IfGoto("LOOP_START".to_string()))
    );
    assert_eq!(
        parse_line("label END"),
        Ok(Command::Label("END".to_string()))
    );
    assert_eq!(
        parse_line("goto END"),
        Ok(Command::Goto("END".to_string()))
    );
}

#[test]
fn test_generated_names_are_reserved() {
    assert!(matches!(parse_line("label VM$TRUE.0"), Err(Error::Parse { .. })));
    assert!(matches!(parse_line("goto VM$RETURN.3"), Err(Error::Parse { .. })));
    assert!(matches!(parse_line("call VM$CONTINUE.1 0"), Err(Error::Parse { .. })));
    assert!(matches!(parse_line("function VM$x 0"), Err(Error::Parse { .. })));
    assert_eq!(
        parse_line("label Main.VM$loop"),
        Ok(Command::Label("Main.VM$loop".to_string()))
    );
}

#[test]
fn test_functions() {
    assert_eq!(
        parse_line("function SimpleFunction.test 2"),
        Ok(Command::Function("SimpleFunction.test".to_string(), 2))
    );
    assert_eq!(
        parse_line("call Math.multiply 2"),
        Ok(Command::Call("Math.multiply".to_string(), 2))
    );
    assert_eq!(parse_line("return"), Ok(Command::Return));
}
