//! The interactive read-eval-print loop. Plain line-oriented stdin/stdout,
//! no raw mode, no cursor movement.

use std::io::{self, Write};

use tracing::info;

use crate::command::{self, MetaCommandResult};
use crate::statement::{self, Statement};
use crate::storage::{InsertError, Table};

pub fn run(mut table: Table) -> Result<(), crate::errors::Error> {
    let stdin = io::stdin();

    loop {
        print!("db > ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim_end();

        if line.starts_with('.') {
            match command::execute(line, &mut table) {
                MetaCommandResult::Exit => {
                    table.close()?;
                    info!("exiting on .exit");
                    return Ok(());
                }
                MetaCommandResult::Handled => continue,
            }
        }

        match statement::prepare(line) {
            Ok(Statement::Insert(row)) => match table.insert(row) {
                Ok(()) => println!("Executed."),
                Err(e @ InsertError::DuplicateKey) => println!("{e}"),
                Err(InsertError::Storage(e)) => return Err(e),
            },
            Ok(Statement::Select) => {
                table.scan(|row| println!("{row}"))?;
                println!("Executed.");
            }
            Err(e) => println!("{e}"),
        }
    }

    table.close()
}
