use std::env;
use std::io::Write;
use std::process::{Command, Output, Stdio};

fn run(db_path: &std::path::Path, input: &[String]) -> Output {
    let mut process = rowstore_exe()
        .arg(db_path)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("unable to start rowstore");

    let stdin = process.stdin.as_mut().expect("no stdin pipe");
    for line in input {
        stdin
            .write_all(format!("{line}\n").as_bytes())
            .unwrap_or_else(|_| panic!("unable to write command `{line}`"));
    }

    process.wait_with_output().expect("process did not exit")
}

fn lines(output: &Output) -> Vec<String> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::to_owned)
        .collect()
}

#[test]
fn insert_and_retrieve_row() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("t.db");
    let input = vec![
        "insert 1 user1 person1@example.com".to_owned(),
        "select".to_owned(),
        ".exit".to_owned(),
    ];

    let output = run(&path, &input);

    assert_eq!(
        lines(&output),
        vec![
            "db > Executed.".to_owned(),
            "db > (1, user1, person1@example.com)".to_owned(),
            "Executed.".to_owned(),
            "db > ".to_owned(),
        ]
    );
}

#[test]
fn rejects_duplicate_key() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("t.db");
    let input = vec![
        "insert 1 alice alice@x.com".to_owned(),
        "insert 1 eve eve@x.com".to_owned(),
        "select".to_owned(),
        ".exit".to_owned(),
    ];

    let output = run(&path, &input);

    assert_eq!(
        lines(&output),
        vec![
            "db > Executed.".to_owned(),
            "db > Error: Duplicate key.".to_owned(),
            "db > (1, alice, alice@x.com)".to_owned(),
            "Executed.".to_owned(),
            "db > ".to_owned(),
        ]
    );
}

#[test]
fn rejects_negative_id() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("t.db");
    let input = vec![
        "insert -1 foo bar@x.com".to_owned(),
        "select".to_owned(),
        ".exit".to_owned(),
    ];

    let output = run(&path, &input);

    assert_eq!(
        lines(&output),
        vec![
            "db > ID must be positive.".to_owned(),
            "db > ".to_owned(),
            "Executed.".to_owned(),
            "db > ".to_owned(),
        ]
    );
}

#[test]
fn rejects_oversized_fields() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("t.db");
    let username = "a".repeat(33);
    let input = vec![
        format!("insert 1 {username} a@x.com"),
        ".exit".to_owned(),
    ];

    let output = run(&path, &input);

    assert_eq!(
        lines(&output),
        vec!["db > String is too long.".to_owned(), "db > ".to_owned(),]
    );
}

#[test]
fn allows_maximum_length_fields() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("t.db");
    let username = "a".repeat(32);
    let email = "b".repeat(255);
    let input = vec![
        format!("insert 1 {username} {email}"),
        "select".to_owned(),
        ".exit".to_owned(),
    ];

    let output = run(&path, &input);

    assert_eq!(
        lines(&output),
        vec![
            "db > Executed.".to_owned(),
            format!("db > (1, {username}, {email})"),
            "Executed.".to_owned(),
            "db > ".to_owned(),
        ]
    );
}

#[test]
fn rejects_unrecognized_statement() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("t.db");
    let input = vec!["delete 1".to_owned(), ".exit".to_owned()];

    let output = run(&path, &input);

    assert_eq!(
        lines(&output),
        vec![
            "db > Unrecognized keyword at start of 'delete 1'.".to_owned(),
            "db > ".to_owned(),
        ]
    );
}

#[test]
fn rows_persist_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("t.db");

    run(&path, &["insert 1 alice alice@x.com".to_owned(), ".exit".to_owned()]);
    let output = run(&path, &["select".to_owned(), ".exit".to_owned()]);

    assert_eq!(
        lines(&output),
        vec![
            "db > (1, alice, alice@x.com)".to_owned(),
            "Executed.".to_owned(),
            "db > ".to_owned(),
        ]
    );
}

#[test]
fn non_sequential_inserts_come_back_in_key_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("t.db");
    let mut input: Vec<String> = [5u32, 1, 4, 2, 3]
        .iter()
        .map(|id| format!("insert {id} user{id} user{id}@x.com"))
        .collect();
    input.push("select".to_owned());
    input.push(".exit".to_owned());

    let output = run(&path, &input);
    let rows: Vec<String> = lines(&output)
        .into_iter()
        .filter(|l| l.starts_with('('))
        .collect();

    assert_eq!(
        rows,
        vec![
            "(1, user1, user1@x.com)".to_owned(),
            "(2, user2, user2@x.com)".to_owned(),
            "(3, user3, user3@x.com)".to_owned(),
            "(4, user4, user4@x.com)".to_owned(),
            "(5, user5, user5@x.com)".to_owned(),
        ]
    );
}

/// Inserting past a single leaf's capacity must split it and promote a new
/// root without losing any row or its ordering.
#[test]
fn leaf_split_grows_a_multi_page_tree() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("t.db");
    let n = 200;
    let mut input: Vec<String> = (0..n)
        .rev()
        .map(|id| format!("insert {id} user{id} user{id}@x.com"))
        .collect();
    input.push("select".to_owned());
    input.push(".btree".to_owned());
    input.push(".exit".to_owned());

    let output = run(&path, &input);
    let rows: Vec<u32> = lines(&output)
        .into_iter()
        .filter(|l| l.starts_with('('))
        .map(|l| {
            l.trim_start_matches('(')
                .split(',')
                .next()
                .unwrap()
                .parse()
                .unwrap()
        })
        .collect();

    assert_eq!(rows, (0..n).collect::<Vec<_>>());
}

/// Enough rows to push the tree through many leaf splits while staying
/// comfortably under the pager's page cache capacity. Sequential ascending
/// inserts leave every split-off leaf at 7/13 cells, so 100 pages hold
/// roughly 690-700 rows under one internal root; 600 stays well clear of
/// that ceiling.
#[test]
fn many_inserts_stay_correct_across_repeated_leaf_splits() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("t.db");
    let n = 600;
    let mut input: Vec<String> = (0..n)
        .map(|id| format!("insert {id} user{id} user{id}@x.com"))
        .collect();
    input.push("select".to_owned());
    input.push(".exit".to_owned());

    let output = run(&path, &input);
    let row_count = lines(&output).iter().filter(|l| l.starts_with('(')).count();

    assert_eq!(row_count, n as usize);
}

/// Beyond the pager's fixed page cache, inserts must fail loudly rather than
/// corrupt the file.
#[test]
fn exceeding_pager_capacity_is_a_fatal_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("t.db");
    let n = 5_000;
    let mut input: Vec<String> = (0..n)
        .map(|id| format!("insert {id} user{id} user{id}@x.com"))
        .collect();
    input.push(".exit".to_owned());

    let output = run(&path, &input);

    assert!(!output.status.success());
}

fn rowstore_exe() -> Command {
    let mut path = env::current_exe().expect("current exe");
    path.pop();
    if path.ends_with("deps") {
        path.pop();
    }
    path.push(format!("rowstore{}", env::consts::EXE_SUFFIX));
    Command::new(path)
}
