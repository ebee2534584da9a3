use std::io::{self, BufRead, Write};

// Print a prompt line and block until one line (or EOF) arrives on stdin.
// The input content is ignored; this only paces the interactive flow.
pub fn wait_for_input(msg: &str) {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let _ = writeln!(out, "{msg}");
    let _ = out.flush();

    let mut line = String::new();
    let _ = io::stdin().lock().read_line(&mut line);
}
