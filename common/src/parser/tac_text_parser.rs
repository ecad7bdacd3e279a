use super::TacListingParser;
use crate::{Operand, Quadruple, TacOp, TacProgram};

use regex::Regex;
use std::io::{Error, ErrorKind};
use std::str::FromStr;

/// TextParser for the raw intermediate listing format.
/// Each line holds one quadruple as `NNN: (op, arg1, arg2, result)` where
/// absent slots are written `_`. The listing header line, empty lines and
/// comments starting with # are ignored.
pub struct TacTextParser;

impl TacTextParser {
    const COMMENT_TOKEN: &'static str = "#";
    const HEADER_TOKEN: &'static str = "===";

    pub fn new() -> Self {
        Self
    }

    fn line_regex() -> Regex {
        // Operand slots are either a quoted string (which may contain
        // commas) or a run of non-comma characters.
        Regex::new(concat!(
            r#"^(?P<index>\d+):\s*\(\s*"#,
            r#"(?P<op>[^,]+?)\s*,\s*"#,
            r#"(?P<a1>"[^"]*"|[^,]*?)\s*,\s*"#,
            r#"(?P<a2>"[^"]*"|[^,]*?)\s*,\s*"#,
            r#"(?P<res>"[^"]*"|[^,)]*?)\s*\)$"#,
        )).unwrap()
    }

    /// Parses one operand token. The surrounding op decides the two
    /// ambiguous readings: numeric counts for FUNC/CALL_* arg2 slots and
    /// label names for branch-target slots.
    fn parse_operand(token: &str, as_count: bool, as_label: bool) -> Result<Option<Operand>, Error> {
        let token = token.trim();

        if token == "_" {
            return Ok(None);
        }
        if token == "null" {
            return Ok(Some(Operand::Null));
        }
        if token == "true" || token == "false" {
            return Ok(Some(Operand::Boolean(token == "true")));
        }
        if token.starts_with('"') && token.ends_with('"') && token.len() >= 2 {
            return Ok(Some(Operand::Text(String::from(&token[1..token.len() - 1]))));
        }
        if let Ok(value) = token.parse::<i64>() {
            return Ok(Some(if as_count && value >= 0 {
                Operand::Count(value as usize)
            } else {
                Operand::Integer(value)
            }));
        }
        if let Some(id) = token.strip_prefix('t') {
            if let Ok(id) = id.parse::<u32>() {
                return Ok(Some(Operand::Temporary(id)));
            }
        }
        if token.ends_with(']') {
            if let Some(open) = token.find('[') {
                let base = &token[..open];
                let index = &token[open + 1..token.len() - 1];
                let index = Self::parse_operand(index, false, false)?
                    .ok_or_else(|| Self::invalid(token))?;
                return Ok(Some(Operand::indexed(base, index)));
            }
        }
        if let Some((object, property)) = token.split_once('.') {
            if !object.is_empty() && !property.is_empty() {
                return Ok(Some(Operand::member(object, property)));
            }
        }
        if token.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == '>') && !token.is_empty() {
            return Ok(Some(if as_label {
                Operand::label(token)
            } else {
                Operand::name(token)
            }));
        }

        Err(Self::invalid(token))
    }

    fn invalid(token: &str) -> Error {
        Error::new(ErrorKind::InvalidInput,
                   format!("Unknown listing token found while parsing '{}'.", token))
    }
}

impl TacListingParser for TacTextParser {
    fn parse_str(&self, data: &str) -> Result<TacProgram, Error> {
        let regex = Self::line_regex();
        let mut quadruples: Vec<Quadruple> = Vec::new();

        for line in data.lines() {
            let line = line.trim();
            if line.is_empty()
                || line.starts_with(Self::COMMENT_TOKEN)
                || line.starts_with(Self::HEADER_TOKEN) {
                continue;
            }

            let captures = regex.captures(line)
                .ok_or_else(|| Error::new(ErrorKind::InvalidInput,
                                          format!("Malformed listing line '{}'.", line)))?;

            let op = TacOp::from_str(captures.name("op").unwrap().as_str().trim())
                .map_err(|_| Self::invalid(captures.name("op").unwrap().as_str()))?;

            let arg1_is_label = matches!(op, TacOp::Goto);
            let result_is_label = matches!(op, TacOp::Label | TacOp::If | TacOp::OnException);

            let arg1 = Self::parse_operand(captures.name("a1").unwrap().as_str(), false, arg1_is_label)?;
            let arg2 = Self::parse_operand(captures.name("a2").unwrap().as_str(), op.arg2_is_count(), false)?;
            let result = Self::parse_operand(captures.name("res").unwrap().as_str(), false, result_is_label)?;

            quadruples.push(Quadruple::new(op, arg1, arg2, result));
        }

        Ok(TacProgram::from_quadruples(quadruples))
    }
}

#[cfg(test)]
mod tests {
    use crate::{Operand, Quadruple, TacOp, TacProgram, TacListingParser, TacTextParser};

    #[test]
    fn test_text_parser_basic() {
        let text = "000: (+, 1, 3, t1)\n001: (=, t1, _, x)\n";
        let tac = TacTextParser::new().parse_str(text).unwrap();

        assert_eq!(tac.quadruples(), &[
            Quadruple::new(TacOp::Add, Some(Operand::Integer(1)), Some(Operand::Integer(3)), Some(Operand::Temporary(1))),
            Quadruple::new(TacOp::Assign, Some(Operand::Temporary(1)), None, Some(Operand::name("x"))),
        ]);
    }

    #[test]
    fn test_text_parser_skips_header_comments_and_blanks() {
        let text = format!("{}\n# un comentario\n\n000: (goto, L2, _, _)\n", TacProgram::LISTING_HEADER);
        let tac = TacTextParser::new().parse_str(&text).unwrap();

        assert_eq!(tac.quadruples(), &[
            Quadruple::new(TacOp::Goto, Some(Operand::label("L2")), None, None),
        ]);
    }

    #[test]
    fn test_text_parser_call_counts() {
        let text = "000: (FUNC, add, 2, integer)\n001: (CALL_FUNC, add, 2, t1)\n";
        let tac = TacTextParser::new().parse_str(text).unwrap();

        assert_eq!(tac.quadruples()[0].arg2, Some(Operand::Count(2)));
        assert_eq!(tac.quadruples()[1].arg2, Some(Operand::Count(2)));
    }

    #[test]
    fn test_text_parser_quoted_string_with_comma() {
        let text = "000: (PRINT, _, _, \"hola, mundo\")\n";
        let tac = TacTextParser::new().parse_str(text).unwrap();

        assert_eq!(tac.quadruples()[0].result,
                   Some(Operand::Text(String::from("hola, mundo"))));
    }

    #[test]
    fn test_text_parser_member_and_indexed_operands() {
        let text = "000: (<, t1, arr.size, t2)\n001: (=, 1, _, t1[0])\n";
        let tac = TacTextParser::new().parse_str(text).unwrap();

        assert_eq!(tac.quadruples()[0].arg2, Some(Operand::member("arr", "size")));
        assert_eq!(tac.quadruples()[1].result,
                   Some(Operand::indexed("t1", Operand::Integer(0))));
    }

    #[test]
    fn test_text_parser_invalid_op() {
        let text = "000: (JUMP, L1, _, _)\n";
        TacTextParser::new().parse_str(text).expect_err("Testing Parser Error");
    }

    #[test]
    fn test_text_parser_malformed_line() {
        let text = "this is not a quadruple\n";
        TacTextParser::new().parse_str(text).expect_err("Testing Parser Error");
    }

    #[test]
    fn test_text_parser_round_trip() {
        let mut tac = TacProgram::new();
        tac.emit(TacOp::Add, Some(Operand::Integer(1)), Some(Operand::Integer(3)), Some(Operand::Temporary(1)));
        tac.emit(TacOp::If, Some(Operand::Temporary(1)), Some(Operand::name("goto")), Some(Operand::label("L5")));
        tac.emit(TacOp::Func, Some(Operand::name("f")), Some(Operand::Count(0)), Some(Operand::name("void")));
        tac.emit(TacOp::Return, None, None, None);
        tac.emit(TacOp::EndFunc, None, None, None);

        let reparsed = TacTextParser::new().parse_str(&tac.to_string()).unwrap();
        assert_eq!(reparsed, tac);
    }
}
