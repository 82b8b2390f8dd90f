use std::io::{self, BufRead, Write};

/// Prefix printed in front of every interactive prompt, aligned with the
/// log level column.
pub const PROMPT_PREFIX: &str = "[PROMPT  ]";

/// Interpret a yes/no answer. Only the exact spellings `y`, `Y`, `yes`,
/// `Yes`, `YES` and their `no` counterparts are recognized.
pub fn parse_yes_or_no(answer: &str) -> Option<bool> {
    match answer {
        "y" | "Y" | "yes" | "Yes" | "YES" => Some(true),
        "n" | "N" | "no" | "No" | "NO" => Some(false),
        _ => None,
    }
}

/// Ask `question` until a recognizable answer is read.
///
/// Returns `Ok(None)` for an unrecognized answer when `ask_until_valid` is
/// false. Running out of input is an `UnexpectedEof` error.
pub fn prompt_yes_or_no<R, W>(
    input: &mut R,
    output: &mut W,
    question: &str,
    ask_until_valid: bool,
) -> io::Result<Option<bool>>
where
    R: BufRead,
    W: Write,
{
    loop {
        write!(output, "{} {} (Yes/No): ", PROMPT_PREFIX, question)?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "input closed while waiting for an answer",
            ));
        }

        match parse_yes_or_no(line.trim_end_matches(['\r', '\n'])) {
            Some(answer) => return Ok(Some(answer)),
            None if !ask_until_valid => return Ok(None),
            None => writeln!(output, "{} Unrecognized input.", PROMPT_PREFIX)?,
        }
    }
}
