use crate::ast::{Command::*, Op::*, Segment::*, *};

// TODO: Consider using a static-level string interner for this module
macro_rules! svec {
    ($($x:expr),*) => (vec![$($x.to_string()),*]);
}

fn at_c(arg: &u16) -> String {
    format!("@{arg}", arg = arg)
}

fn at_s(arg: &str) -> String {
    format!("@{arg}", arg = arg)
}

fn pointer_arg(arg: &u16) -> String {
    match arg {
        0 => "THIS",
        1 => "THAT",
        _ => panic!("Invalid pointer {}", arg), // parser keeps this arm dead
    }
    .to_string()
}

// SP++, then store D at the new top
fn push_d() -> Vec<String> {
    svec!["@SP", "M=M+1", "A=M-1", "M=D"]
}

/// Push microcode for the four base-pointer segments
fn seg_push(seg_name: &str, seg: &str, arg: &u16) -> Vec<String> {
    svec![
        format!("// push {} {}", seg_name, arg),
        at_s(seg),
        "D=M",
        at_c(arg),
        "A=A+D", // A = SEG+arg
        "D=M",   // D = value to push
        "@SP",
        "M=M+1",
        "A=M-1", // Don't need to refetch SP; this is safe
        "M=D"
    ]
}

fn seg_push_direct(seg_name: &str, arg: &u16, label: String) -> Vec<String> {
    svec![
        format!("// push {} {}", seg_name, arg),
        format!("@{}", label),
        "D=M",
        "@SP",
        "M=M+1",
        "A=M-1",
        "M=D"
    ]
}

fn seg_pop(seg_name: &str, seg: &str, arg: &u16) -> Vec<String> {
    svec![
        format!("// pop {} {}", seg_name, arg),
        at_s(seg),
        "D=M",
        at_c(arg),
        "D=A+D", // A = SEG+arg
        "@R13",
        "M=D", // Store target addr in R13 before popping clobbers D
        "@SP",
        "AM=M-1", // SP--, A <- new SP (val to be popped)
        "D=M",
        "@R13",
        "A=M", // At the target's address...
        "M=D"  // ... store the popped val
    ]
}

fn seg_pop_direct(seg_name: &str, arg: &u16, label: String) -> Vec<String> {
    svec![
        format!("// pop {} {}", seg_name, arg),
        "@SP",
        "AM=M-1",
        "D=M",
        format!("@{}", label),
        "M=D"
    ]
}

fn simple_un_op(name: &str, op: char) -> Vec<String> {
    svec![format!("// {}", name), "@SP", "A=M-1", format!("M={}M", op)]
}

// i.e. no conditions or jumps, just pop and run
fn simple_bin_op(name: &str, op: char) -> Vec<String> {
    svec![
        format!("// {}", name),
        "@SP",
        "AM=M-1",              // SP--, looking at top of stack now
        "D=M",                 // Right arg in D
        "A=A-1",               // Looking at second arg of stack, will overwrite
        format!("M=M{}D", op)  // Op and overwrite second element
    ]
}

pub struct Translator<'a> {
    assembly: &'a str,
    function: Option<String>,
    gen_sym: usize,
}

impl<'a> Translator<'a> {
    pub fn new(assembly: &'a str) -> Self {
        Translator {
            assembly,
            function: None,
            gen_sym: 0,
        }
    }

    /// One-time program prologue: point SP at the stack base and hand
    /// control to Sys.init. Emitted once per linked program, never per unit.
    pub fn bootstrap() -> Vec<String> {
        let mut instructions = svec!["// bootstrap", "@256", "D=A", "@SP", "M=D"];
        instructions.extend(Translator::new("Bootstrap").call("Sys.init", &0));
        instructions
    }

    fn next_gen_sym(&mut self) -> usize {
        let tmp = self.gen_sym;
        self.gen_sym += 1;
        tmp
    }

    /// Labels live inside the current VM function; toplevel code falls back
    /// to the unit name.
    fn scope(&self) -> &str {
        self.function.as_deref().unwrap_or(self.assembly)
    }

    fn push(&self, segment: &Segment, arg: &u16) -> Vec<String> {
        match segment {
            Constant => svec![
                format!("// push constant {}", arg),
                at_c(arg),
                "D=A",
                "@SP",
                "A=M",
                "M=D",
                "@SP",
                "M=M+1"
            ],
            Local => seg_push("local", "LCL", arg),
            Argument => seg_push("argument", "ARG", arg),
            This => seg_push("this", "THIS", arg),
            That => seg_push("that", "THAT", arg),
            Static => seg_push_direct("static", arg, format!("{}.{}", self.assembly, arg)),
            Temp => seg_push_direct("temp", arg, format!("R{}", arg + 5)),
            Pointer => seg_push_direct("pointer", arg, pointer_arg(arg)),
        }
    }

    fn pop(&self, segment: &Segment, arg: &u16) -> Vec<String> {
        match segment {
            Constant => panic!("Should not pop constants"), // parser keeps this arm dead
            Local => seg_pop("local", "LCL", arg),
            Argument => seg_pop("argument", "ARG", arg),
            This => seg_pop("this", "THIS", arg),
            That => seg_pop("that", "THAT", arg),
            Static => seg_pop_direct("static", arg, format!("{}.{}", self.assembly, arg)),
            Temp => seg_pop_direct("temp", arg, format!("R{}", arg + 5)),
            Pointer => seg_pop_direct("pointer", arg, pointer_arg(arg)),
        }
    }

    fn compare(&mut self, cmp_name: &str, jump: &str) -> Vec<String> {
        let sym = self.next_gen_sym();
        let cmp_sym = format!("{}:CMP_{}", self.assembly, sym);
        let end_sym = format!("{}:ENDCMP_{}", self.assembly, sym);
        svec![
            format!("// {}", cmp_name),
            "@SP",
            "AM=M-1", // SP--, looking at top of stack now
            "D=M",    // Right arg in D
            "A=A-1",  // Looking at second arg of stack, will overwrite
            "D=M-D",
            format!("@{}", cmp_sym),
            format!("D;J{}", jump),
            "D=0",
            format!("@{}", end_sym),
            "0;JMP",
            format!("({})", cmp_sym),
            "D=-1",
            format!("({})", end_sym),
            "@SP",
            "A=M-1",
            "M=D"
        ]
    }

    /// Convert VM label to Hack ASM symbol - for consistency across instructions
    fn label_to_sym(&self, label: &str) -> String {
        format!("{}:LABEL_{}", self.scope(), label)
    }

    fn label(&self, label: &str) -> Vec<String> {
        svec![
            format!("// label {}", label),
            format!("({})", self.label_to_sym(label))
        ]
    }

    fn goto(&self, label: &str) -> Vec<String> {
        svec![
            format!("// goto {}", label),
            format!("@{}", self.label_to_sym(label)),
            "0;JMP" // Unconditional jump
        ]
    }

    fn if_goto(&self, label: &str) -> Vec<String> {
        svec![
            format!("// if-goto {}", label),
            "@SP",
            "AM=M-1",
            "D=M",  // Stack popped into D
            format!("@{}", self.label_to_sym(label)),
            "D;JNE" // False is 0
        ]
    }

    /// Function entry: a program-global label, then one zeroed stack slot
    /// per declared local.
    fn define(&mut self, name: &str, locals: &u16) -> Vec<String> {
        self.function = Some(name.to_string());
        let mut instructions = svec![
            format!("// function {} {}", name, locals),
            format!("({})", name)
        ];
        for _ in 0..*locals {
            instructions.extend(svec!["@SP", "M=M+1", "A=M-1", "M=0"]);
        }
        instructions
    }

    fn call(&mut self, name: &str, args: &u16) -> Vec<String> {
        let sym = self.next_gen_sym();
        // Unit-qualified like the CMP labels; a function named after another
        // unit's file stem must not be able to reproduce its symbols.
        let ret_sym = format!("{}:RET_{}", self.assembly, sym);

        // The callee's ARG base is old SP - args. Grab it into R13 before
        // the frame pushes move SP, and install it only after the caller's
        // own ARG has been saved.
        let mut instructions = svec![
            format!("// call {} {}", name, args),
            "@SP",
            "D=M",
            at_c(args),
            "D=D-A",
            "@R13",
            "M=D",
            format!("@{}", ret_sym),
            "D=A"
        ];
        instructions.extend(push_d());
        for saved in ["LCL", "ARG", "THIS", "THAT"] {
            instructions.extend(svec![at_s(saved), "D=M"]);
            instructions.extend(push_d());
        }
        instructions.extend(svec![
            "@R13",
            "D=M",
            "@ARG",
            "M=D", // ARG = old SP - args
            "@SP",
            "D=M",
            "@LCL",
            "M=D", // LCL = SP, right above the saved frame
            at_s(name),
            "0;JMP",
            format!("({})", ret_sym)
        ]);
        instructions
    }

    fn ret(&self) -> Vec<String> {
        svec![
            "// return",
            "@LCL",
            "D=M",
            "@R13",
            "M=D", // R13 = frame base (the callee's LCL)
            "@5",
            "A=D-A",
            "D=M",
            "@R14",
            "M=D", // R14 = return address; with zero args *ARG overwrites it
            "@SP",
            "A=M-1",
            "D=M",
            "@ARG",
            "A=M",
            "M=D", // *ARG = return value
            "@ARG",
            "D=M+1",
            "@SP",
            "M=D", // SP = ARG + 1
            "@R13",
            "AM=M-1",
            "D=M",
            "@THAT",
            "M=D", // THAT = *(frame - 1)
            "@R13",
            "AM=M-1",
            "D=M",
            "@THIS",
            "M=D", // THIS = *(frame - 2)
            "@R13",
            "AM=M-1",
            "D=M",
            "@ARG",
            "M=D", // ARG = *(frame - 3)
            "@R13",
            "AM=M-1",
            "D=M",
            "@LCL",
            "M=D", // LCL last; every other slot was located through it
            "@R14",
            "A=M",
            "0;JMP"
        ]
    }

    pub fn translate(&mut self, commands: &Vec<Command>) -> Vec<String> {
        let mut instructions: Vec<String> = vec![];

        for command in commands {
            log::trace!("emitting {:?}", command);
            let translated = match command {
                Push(seg, arg) => self.push(seg, arg),
                Pop(seg, arg) => self.pop(seg, arg),
                Arithmetic(Not) => simple_un_op("not", '!'),
                Arithmetic(Neg) => simple_un_op("neg", '-'),
                Arithmetic(Add) => simple_bin_op("add", '+'),
                Arithmetic(Sub) => simple_bin_op("sub", '-'),
                Arithmetic(And) => simple_bin_op("and", '&'),
                Arithmetic(Or) => simple_bin_op("or", '|'),
                Arithmetic(Eq) => self.compare("eq", "EQ"),
                Arithmetic(Gt) => self.compare("gt", "GT"),
                Arithmetic(Lt) => self.compare("lt", "LT"),
                Label(sym) => self.label(sym),
                Goto(sym) => self.goto(sym),
                IfGoto(sym) => self.if_goto(sym),
                Function(name, locals) => self.define(name, locals),
                Call(name, args) => self.call(name, args),
                Return => self.ret(),
            };

            for line in translated {
                instructions.push(line);
            }
        }

        instructions
    }
}
