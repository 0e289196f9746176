//! Dot-prefixed meta-commands: `.exit`, `.btree`, `.constants`, `.help`.

use crate::storage::{Table, LEAF_CELL_SIZE, LEAF_MAX_CELLS, PAGE_SIZE, ROW_SIZE};

pub enum MetaCommandResult {
    Handled,
    Exit,
}

pub fn execute(line: &str, table: &mut Table) -> MetaCommandResult {
    match line {
        ".exit" => MetaCommandResult::Exit,
        ".btree" => {
            match table.dump_tree() {
                Ok(tree) => print!("{tree}"),
                Err(e) => println!("{e}"),
            }
            MetaCommandResult::Handled
        }
        ".constants" => {
            print_constants();
            MetaCommandResult::Handled
        }
        ".help" => {
            print_help();
            MetaCommandResult::Handled
        }
        _ => {
            println!("Unrecognized command '{line}'.");
            MetaCommandResult::Handled
        }
    }
}

fn print_constants() {
    println!("ROW_SIZE: {ROW_SIZE}");
    println!("PAGE_SIZE: {PAGE_SIZE}");
    println!("LEAF_NODE_CELL_SIZE: {LEAF_CELL_SIZE}");
    println!("LEAF_NODE_MAX_CELLS: {LEAF_MAX_CELLS}");
}

fn print_help() {
    println!(".exit        close the database and quit");
    println!(".btree       print the B+-tree structure");
    println!(".constants   print layout constants");
    println!(".help        show this message");
}
