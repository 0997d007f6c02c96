use std::{
    env, fs,
    path::{Path, PathBuf},
    process,
};

use log::info;
use snafu::ResultExt;

use crate::error::{InvalidInputSnafu, IoSnafu, TranslateResult, UnitSnafu};
use crate::translator::Translator;

mod ast;
mod error;
mod parser;
mod translator;


fn usage() -> ! {
    eprintln!("usage: vm-translator <file.vm | directory>");
    process::exit(2);
}

fn main() {
    env_logger::init();

    let mut args = env::args().skip(1);
    let path = match (args.next(), args.next()) {
        (Some(path), None) => PathBuf::from(path),
        _ => usage(),
    };

    match run(&path) {
        Ok(target) => info!("wrote {}", target.display()),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

fn run(path: &Path) -> TranslateResult<PathBuf> {
    let mut output = vec![];

    let target = if path.is_dir() {
        // Whole-program mode: bootstrap once, then every unit in a stable order.
        output.extend(Translator::bootstrap());

        let mut units = vec![];
        for entry in fs::read_dir(path).context(IoSnafu { path })? {
            let entry = entry.context(IoSnafu { path })?;
            let unit = entry.path();
            if unit.extension().map_or(false, |ext| ext == "vm") {
                units.push(unit);
            }
        }
        if units.is_empty() {
            return InvalidInputSnafu {
                path,
                reason: "no .vm files to translate",
            }
            .fail();
        }
        units.sort();
        for unit in &units {
            output.extend(translate_unit(unit)?);
        }

        let program = path
            .canonicalize()
            .context(IoSnafu { path })?
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string);
        let Some(program) = program else {
            return InvalidInputSnafu {
                path,
                reason: "cannot derive a program name",
            }
            .fail();
        };
        path.join(format!("{program}.asm"))
    } else {
        if path.extension().map_or(true, |ext| ext != "vm") {
            return InvalidInputSnafu {
                path,
                reason: "expected a .vm file or a directory",
            }
            .fail();
        }
        output.extend(translate_unit(path)?);
        path.with_extension("asm")
    };

    let mut text = String::new();
    for line in &output {
        text.push_str(line);
        text.push('\n');
    }
    fs::write(&target, text).context(IoSnafu { path: &target })?;

    Ok(target)
}

/// Translates one source unit with a fresh generator; the unit's file stem
/// namespaces its statics and its toplevel labels.
fn translate_unit(path: &Path) -> TranslateResult<Vec<String>> {
    let Some(unit) = path.file_stem().and_then(|stem| stem.to_str()) else {
        return InvalidInputSnafu {
            path,
            reason: "cannot derive a unit name",
        }
        .fail();
    };
    info!("translating {}", path.display());

    let source = fs::read_to_string(path).context(IoSnafu { path })?;
    let commands = parser::parse(&source).context(UnitSnafu { path })?;
    Ok(Translator::new(unit).translate(&commands))
}
