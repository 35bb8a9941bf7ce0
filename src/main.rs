use std::{
    fmt::Write as _,
    fs,
    io::{self, Read},
};

use anyhow::Result;
use clap::Parser;

mod cfg;
mod codegen;
mod commandline;
mod ir;
mod optimiser;

use cfg::Program;
use commandline::{Backend, Options};

fn main() -> Result<()> {
    let options = Options::parse();
    stderrlog::new().verbosity(options.verbose).init()?;

    let source = match &options.file {
        Some(path) => fs::read_to_string(path)?,
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    let instructions = ir::parse(&source)?;
    let mut program = Program::from_instructions(instructions);

    if options.scp {
        optimiser::propagate_constants(&mut program);
    }
    if options.dse {
        optimiser::eliminate_dead_stores(&mut program);
    }
    if options.report {
        print!("{}", report(&program, &options));
    }

    match options.backend {
        Backend::ThreeAddr => print!("{}", program),
        Backend::C => print!("{}", codegen::c::render(&program)),
        Backend::Cfg => print!("{}", codegen::cfg_dump::render(&program)),
    }

    Ok(())
}

/// One section per pass: every function's propagation count, then every
/// function's elimination count.
fn report(program: &Program, options: &Options) -> String {
    let mut out = String::new();
    if options.scp {
        for function in &program.functions {
            writeln!(out, "Function: {}", function.id).unwrap();
            writeln!(
                out,
                "Number of constants propagated: {}",
                function.constants_propagated
            )
            .unwrap();
        }
    }
    if options.dse {
        for function in &program.functions {
            writeln!(out, "Function: {}", function.id).unwrap();
            writeln!(
                out,
                "Number of statements eliminated: {}",
                function.statements_eliminated
            )
            .unwrap();
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_groups_each_pass_into_its_own_section() {
        let options = Options::parse_from(["tacopt", "--scp", "--dse", "--report"]);
        let mut program = Program::from_instructions(
            ir::parse(
                "instr 2: enter 8
                 instr 3: move a#24 5
                 instr 4: add a#24 3
                 instr 5: ret 0",
            )
            .unwrap(),
        );
        optimiser::propagate_constants(&mut program);
        optimiser::eliminate_dead_stores(&mut program);

        let expected = "\
Function: 2
Number of constants propagated: 1
Function: 2
Number of statements eliminated: 2
";
        assert_eq!(expected, report(&program, &options));
    }
}
