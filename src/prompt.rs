use crate::error::{MirrorError, Result};
use colored::Colorize;
use std::io::{self, BufRead, Write};

/// 交互式输入: 从列表中选择, 或输入带校验的文本
///
/// Nothing here touches the mirror set; callers mutate only after every
/// answer has been collected.
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl Prompter<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        // EOF (Ctrl-D) 视为放弃
        if self.input.read_line(&mut line)? == 0 {
            return Err(MirrorError::Aborted);
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    /// 选择一项, 可以输入序号或名称
    pub fn select(&mut self, message: &str, choices: &[String]) -> Result<String> {
        writeln!(self.output, "{}", message.bold())?;
        for (i, choice) in choices.iter().enumerate() {
            writeln!(self.output, "  {:>2}) {}", i + 1, choice)?;
        }

        loop {
            write!(self.output, "> ")?;
            self.output.flush()?;
            let answer = self.read_line()?;
            let answer = answer.trim();

            if let Ok(idx) = answer.parse::<usize>() {
                if (1..=choices.len()).contains(&idx) {
                    return Ok(choices[idx - 1].clone());
                }
            }
            if let Some(choice) = choices.iter().find(|c| c.as_str() == answer) {
                return Ok(choice.clone());
            }
            writeln!(self.output, "{}", "Invalid choice, try again".red())?;
        }
    }

    /// 输入文本, 校验失败时提示原因并重新输入
    pub fn input<F>(&mut self, message: &str, validate: F) -> Result<String>
    where
        F: Fn(&str) -> Result<()>,
    {
        loop {
            write!(self.output, "{} ", message.bold())?;
            self.output.flush()?;
            let answer = self.read_line()?;
            match validate(&answer) {
                Ok(()) => return Ok(answer),
                Err(e) => writeln!(self.output, "{}", e.to_string().red())?,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::validate_url;
    use std::io::Cursor;

    fn prompter(input: &str) -> Prompter<Cursor<Vec<u8>>, Vec<u8>> {
        Prompter::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn test_select_by_index_or_name() -> Result<()> {
        let choices = vec!["foo".to_string(), "bar".to_string()];

        assert_eq!(prompter("2\n").select("pick", &choices)?, "bar");
        assert_eq!(prompter("foo\n").select("pick", &choices)?, "foo");
        // 非法输入后重试
        assert_eq!(prompter("9\nbaz\n1\n").select("pick", &choices)?, "foo");
        Ok(())
    }

    #[test]
    fn test_input_revalidates() -> Result<()> {
        let mut p = prompter("   \nhttps://foo.example/\n");
        assert_eq!(p.input("url?", validate_url)?, "https://foo.example/");

        let output = String::from_utf8_lossy(&p.output).to_string();
        assert!(output.contains("must not be empty"));
        Ok(())
    }

    #[test]
    fn test_eof_aborts() {
        let choices = vec!["foo".to_string()];
        assert!(matches!(prompter("").select("pick", &choices), Err(MirrorError::Aborted)));
        assert!(matches!(prompter("").input("name?", |_| Ok(())), Err(MirrorError::Aborted)));
    }
}
