//! DIMACS CNF and solver-output text.

use std::io::{BufRead, BufReader, BufWriter, Read, Write};

use crate::{
    error::DimacsError,
    types::{Lit, Problem, Solution},
};

fn syntax(line: usize, message: impl Into<String>) -> DimacsError {
    DimacsError::Syntax {
        line,
        message: message.into(),
    }
}

pub fn read_problem(reader: &mut impl Read) -> Result<Problem, DimacsError> {
    let mut lines = BufReader::new(reader).lines().enumerate();

    let (var_count, clause_count) = loop {
        let (i, line) = lines.next().ok_or(DimacsError::MissingHeader)?;
        let line = line?;

        if line.starts_with('c') || line.trim().is_empty() {
            // comment line
            continue;
        }

        // problem line
        let parts: Vec<&str> = line.split_whitespace().collect();
        let [p, cnf, vars, clauses] = parts[..] else {
            return Err(syntax(i + 1, "expected `p cnf <vars> <clauses>`"));
        };
        if p != "p" || cnf != "cnf" {
            return Err(DimacsError::MissingHeader);
        }
        let vars = vars
            .parse::<usize>()
            .map_err(|e| syntax(i + 1, format!("variable count: {e}")))?;
        let clauses = clauses
            .parse::<usize>()
            .map_err(|e| syntax(i + 1, format!("clause count: {e}")))?;
        break (vars, clauses);
    };

    let mut clauses = vec![];
    let mut clause = vec![];

    for (i, line) in lines {
        let line = line?;
        if line.starts_with('c') {
            continue;
        }
        // end marker used by the SATLIB benchmark files
        if line.starts_with('%') {
            break;
        }

        for word in line.split_whitespace() {
            let lit = word
                .parse::<Lit>()
                .map_err(|e| syntax(i + 1, format!("literal `{word}`: {e}")))?;
            match lit {
                0 => {
                    clauses.push(std::mem::take(&mut clause));
                }
                _ => {
                    if lit.unsigned_abs() as usize > var_count {
                        return Err(DimacsError::LiteralRange { lit, var_count });
                    }
                    clause.push(lit);
                }
            }
        }
    }

    if clause_count != clauses.len() {
        return Err(DimacsError::ClauseCount {
            expected: clause_count,
            actual: clauses.len(),
        });
    }

    Ok(Problem { var_count, clauses })
}

pub fn write_problem(writer: &mut impl Write, problem: &Problem) -> std::io::Result<()> {
    let mut writer = BufWriter::new(writer);
    writeln!(writer, "p cnf {} {}", problem.var_count, problem.clauses.len())?;
    for clause in &problem.clauses {
        for lit in clause {
            write!(writer, "{lit} ")?;
        }
        writeln!(writer, "0")?;
    }
    writer.flush()
}

pub fn write_solution(writer: &mut impl Write, solution: &Solution) -> std::io::Result<()> {
    let mut writer = BufWriter::new(writer);
    writeln!(writer, "c Solved by hitman-sat.")?;

    let solution_str = match solution {
        Solution::Sat { .. } => "SATISFIABLE",
        Solution::Unsat => "UNSATISFIABLE",
        Solution::Unknown => "UNKNOWN",
    };
    writeln!(writer, "s {solution_str}")?;

    if let Solution::Sat { model } = solution {
        let model_str = model
            .iter()
            .fold(String::new(), |str, lit| str + &lit.to_string() + " ");
        writeln!(writer, "v {model_str}0")?;
    }
    writer.flush()
}

/// Parses solver output: a banner line, then `s SATISFIABLE` with the
/// model on the following `v` line, or `s UNSATISFIABLE`.
pub fn read_solution(text: &str) -> Result<Solution, DimacsError> {
    let mut lines = text.lines();
    let _banner = lines.next();
    let status = lines.next().ok_or(DimacsError::MissingStatus)?.trim_end();

    match status {
        "s SATISFIABLE" => {
            let values = lines.next().unwrap_or_default();
            let values = values
                .strip_prefix("v ")
                .ok_or_else(|| syntax(3, "expected a `v` model line"))?;
            let mut model = vec![];
            for word in values.split_whitespace() {
                let lit = word
                    .parse::<Lit>()
                    .map_err(|e| syntax(3, format!("literal `{word}`: {e}")))?;
                if lit == 0 {
                    break;
                }
                model.push(lit);
            }
            Ok(Solution::Sat { model })
        }
        "s UNSATISFIABLE" => Ok(Solution::Unsat),
        other => Err(DimacsError::UnknownStatus(other.to_string())),
    }
}
