use nom::{
    branch::alt,
    bytes::complete::{is_a, tag},
    character::{
        complete::{digit1, space1},
        is_digit,
    },
    combinator::{map, map_res, verify},
    sequence::tuple,
    IResult,
};

use crate::ast::{Command::*, Op::*, Segment::*, *};
use crate::error::{TranslateError, TranslateResult};

const SEGMENTS: [&str; 8] = [
    "constant", "local", "static", "argument", "this", "that", "pointer", "temp",
];
const MNEMONICS: [&str; 9] = ["add", "sub", "neg", "eq", "gt", "lt", "and", "or", "not"];

fn integer(input: &str) -> IResult<&str, u16> {
    map_res(digit1, |c: &str| c.parse())(input)
}

fn segment(input: &str) -> IResult<&str, Segment> {
    map(
        alt((
            tag("constant"),
            tag("local"),
            tag("static"),
            tag("argument"),
            tag("this"),
            tag("that"),
            tag("pointer"),
            tag("temp"),
        )),
        |seg| match seg {
            "constant" => Constant,
            "local" => Local,
            "static" => Static,
            "argument" => Argument,
            "this" => This,
            "that" => That,
            "pointer" => Pointer,
            "temp" => Temp,
            _ => panic!("Unexpected parse {}", seg),
        },
    )(input)
}

/// Pointer aliases two cells and temp owns eight; larger indices would land
/// in unrelated registers.
fn in_range(command: &Command) -> bool {
    match command {
        Push(Pointer, arg) | Pop(Pointer, arg) => *arg <= 1,
        Push(Temp, arg) | Pop(Temp, arg) => *arg <= 7,
        _ => true,
    }
}

fn push(input: &str) -> IResult<&str, Command> {
    verify(
        map(
            tuple((tag("push"), space1, segment, space1, integer)),
            |(_, _, segment, _, arg)| Push(segment, arg),
        ),
        in_range,
    )(input)
}

#[test]
fn test_push() {
    assert_eq!(push("push  pointer  1"), Ok(("", Push(Pointer, 1))));
    assert_eq!(push("push constant 3040"), Ok(("", Push(Constant, 3040))));
    assert!(push("push pointer 2").is_err());
}

fn pop(input: &str) -> IResult<&str, Command> {
    verify(
        map(
            tuple((tag("pop"), space1, segment, space1, integer)),
            |(_, _, segment, _, arg)| Pop(segment, arg),
        ),
        |p| !matches!(p, Pop(Constant, _)) && in_range(p),
    )(input)
}

#[test]
fn test_pop() {
    assert_eq!(pop("pop temp 7"), Ok(("", Pop(Temp, 7))));
    assert!(pop("pop constant 7").is_err());
    assert!(pop("pop temp 8").is_err());
}

fn prim(input: &str) -> IResult<&str, Command> {
    map(
        alt((
            tag("add"),
            tag("sub"),
            tag("neg"),
            tag("eq"),
            tag("gt"),
            tag("lt"),
            tag("and"),
            tag("or"),
            tag("not"),
        )),
        |prim| {
            Arithmetic(match prim {
                "add" => Add,
                "sub" => Sub,
                "neg" => Neg,
                "eq" => Eq,
                "gt" => Gt,
                "lt" => Lt,
                "and" => And,
                "or" => Or,
                "not" => Not,
                _ => panic!("Unexpected parse {}", prim),
            })
        },
    )(input)
}

#[test]
fn test_prim() {
    assert_eq!(prim("neg"), Ok(("", Arithmetic(Neg))));
}

fn symbol(input: &str) -> IResult<&str, &str> {
    verify(
        is_a("abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ_.$:0123456789"),
        |c: &str| !is_digit(c.as_bytes()[0]),
    )(input)
}

fn branching(input: &str) -> IResult<&str, Command> {
    map(
        tuple((
            alt((tag("label"), tag("goto"), tag("if-goto"))),
            space1,
            symbol,
        )),
        |(op, _, sym)| match op {
            "label" => Label(sym.to_string()),
            "goto" => Goto(sym.to_string()),
            "if-goto" => IfGoto(sym.to_string()),
            _ => panic!("Unexpected parse {}", sym),
        },
    )(input)
}

#[test]
fn test_branching() {
    assert_eq!(branching("label LOOP"), Ok(("", Label("LOOP".to_string()))));
    assert_eq!(branching("goto END"), Ok(("", Goto("END".to_string()))));
    assert_eq!(
        branching("if-goto WHILE_0"),
        Ok(("", IfGoto("WHILE_0".to_string())))
    );
}

fn function(input: &str) -> IResult<&str, Command> {
    map(
        tuple((tag("function"), space1, symbol, space1, integer)),
        |(_, _, name, _, locals)| Function(name.to_string(), locals),
    )(input)
}

fn call(input: &str) -> IResult<&str, Command> {
    map(
        tuple((tag("call"), space1, symbol, space1, integer)),
        |(_, _, name, _, args)| Call(name.to_string(), args),
    )(input)
}

fn ret(input: &str) -> IResult<&str, Command> {
    map(tag("return"), |_| Return)(input)
}

#[test]
fn test_functions() {
    assert_eq!(
        function("function Sys.init 0"),
        Ok(("", Function("Sys.init".to_string(), 0)))
    );
    assert_eq!(
        call("call Math.max 2"),
        Ok(("", Call("Math.max".to_string(), 2)))
    );
    assert_eq!(ret("return"), Ok(("", Return)));
}

pub fn parse(input: &str) -> TranslateResult<Vec<Command>> {
    let mut commands = vec![];

    for (index, line) in input.lines().enumerate() {
        let line = line.split_once("//").map(|(s, _)| s).unwrap_or(line).trim();
        if line.is_empty() {
            continue;
        }

        let res = alt((push, pop, prim, branching, function, call, ret))(line);

        match res {
            Ok(("", command)) => commands.push(command),
            _ => return Err(classify(line, index + 1)),
        }
    }

    log::debug!("parsed {} commands", commands.len());
    Ok(commands)
}

/// Pin a line the combinators rejected to the most specific error we can
/// name: bad keyword, bad segment, missing or non-numeric operand, and only
/// then the catch-all.
fn classify(line: &str, line_no: usize) -> TranslateError {
    let malformed = TranslateError::MalformedCommand {
        line: line.to_string(),
        line_no,
    };
    let arity = |message: String| TranslateError::Arity { message, line_no };

    let mut words = line.split_whitespace();
    let keyword = words.next().unwrap_or_default();
    let arg1 = words.next();
    let arg2 = words.next();

    match keyword {
        "push" | "pop" => {
            let Some(seg) = arg1 else {
                return arity(format!("'{keyword}' needs a segment and an index"));
            };
            if !SEGMENTS.contains(&seg) {
                return TranslateError::UnknownSegment {
                    segment: seg.to_string(),
                    line_no,
                };
            }
            match arg2 {
                None => arity(format!("'{keyword} {seg}' is missing its index")),
                Some(index) if index.parse::<u16>().is_err() => {
                    arity(format!("'{index}' is not a valid index"))
                }
                Some(_) => malformed,
            }
        }
        "function" | "call" => match (arg1, arg2) {
            (None, _) => arity(format!("'{keyword}' needs a name and a count")),
            (Some(name), None) => arity(format!("'{keyword} {name}' is missing its count")),
            (_, Some(count)) if count.parse::<u16>().is_err() => {
                arity(format!("'{count}' is not a valid count"))
            }
            _ => malformed,
        },
        "label" | "goto" | "if-goto" => match arg1 {
            None => arity(format!("'{keyword}' needs a label name")),
            Some(_) => malformed,
        },
        _ if MNEMONICS.contains(&keyword) || keyword == "return" => malformed,
        _ => TranslateError::UnknownKeyword {
            keyword: keyword.to_string(),
            line_no,
        },
    }
}

#[test]
fn test_parse_skips_comments_and_blanks() {
    let source = "// full line comment\n\n   \npush constant 5 // trailing\n";
    assert_eq!(parse(source).unwrap(), vec![Push(Constant, 5)]);
}

#[test]
fn test_parse_reports_line_numbers() {
    let source = "push constant 1\n\n// comment\nbogus cmd\n";
    assert!(matches!(
        parse(source),
        Err(TranslateError::UnknownKeyword { line_no: 4, .. })
    ));
}

#[test]
fn test_keywords_match_whole_words() {
    assert!(matches!(
        parse("pushes constant 1"),
        Err(TranslateError::UnknownKeyword { ref keyword, .. }) if keyword == "pushes"
    ));
    assert!(matches!(
        parse("iffy LOOP"),
        Err(TranslateError::UnknownKeyword { .. })
    ));
}

#[test]
fn test_unknown_segment() {
    assert!(matches!(
        parse("push konstant 3"),
        Err(TranslateError::UnknownSegment { ref segment, .. }) if segment == "konstant"
    ));
}

#[test]
fn test_missing_or_bad_operands() {
    assert!(matches!(
        parse("push constant"),
        Err(TranslateError::Arity { .. })
    ));
    assert!(matches!(
        parse("push constant seven"),
        Err(TranslateError::Arity { .. })
    ));
    assert!(matches!(
        parse("push constant 99999"),
        Err(TranslateError::Arity { .. })
    ));
    assert!(matches!(
        parse("call Sys.halt"),
        Err(TranslateError::Arity { .. })
    ));
    assert!(matches!(parse("label"), Err(TranslateError::Arity { .. })));
}

#[test]
fn test_rejected_commands() {
    assert!(matches!(
        parse("pop constant 5"),
        Err(TranslateError::MalformedCommand { .. })
    ));
    assert!(matches!(
        parse("push pointer 2"),
        Err(TranslateError::MalformedCommand { .. })
    ));
    assert!(matches!(
        parse("pop temp 8"),
        Err(TranslateError::MalformedCommand { .. })
    ));
    assert!(matches!(
        parse("add 1"),
        Err(TranslateError::MalformedCommand { .. })
    ));
    assert!(matches!(
        parse("return 0"),
        Err(TranslateError::MalformedCommand { .. })
    ));
}
