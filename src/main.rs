#![warn(missing_debug_implementations)]

use std::io;
use std::io::{BufWriter, Read, Write};

use crate::queries::parse_simulation;
use crate::runner::run_queries;

mod exceptions;
mod location;
mod manager;
mod queries;
mod reader;
mod runner;
mod test;


fn main() -> Result<(), ()> {
    let mut input = String::new();
    io::stdin().read_to_string(&mut input)
        .expect("Input should be readable");
    match parse_simulation(&input) {
        Ok(simulation) => {
            let responses = run_queries(simulation.memory_size, &simulation.queries);
            let stdout = io::stdout();
            let mut output = BufWriter::new(stdout.lock());
            for response in &responses {
                writeln!(output, "{}", response).expect("Output should be writable");
            }
            output.flush().expect("Output should be writable");
            Ok(())
        }
        Err(exception) => {
            exception.print_with_input(&input);
            Err(())
        }
    }
}
