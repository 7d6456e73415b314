//! Rule DSL parser.
//!
//! Recursive descent parser for the rule grammar. Converts text to AST with
//! meaningful error messages including character offset, expected/found tokens.
//!
//! ```text
//! rule     := CMP "(" operand "," operand ")"
//!           | "BETWEEN" "(" operand "," operand "," operand ")"
//!           | ("AND" | "OR") "(" rule ("," rule)+ ")"
//!           | "NOT" "(" rule ")"
//! CMP      := "ABOVE" | "BELOW" | "CROSS_ABOVE" | "CROSS_BELOW"
//! operand  := number | "$" ident | "MUL" "(" operand "," operand ")" | column
//! column   := [a-z][a-z0-9_]*
//! ```
//!
//! Keywords are upper case; column names and parameter keys are lower case.

use crate::domain::error::ParseError;
use crate::domain::rule::{Operand, Rule};

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn expect_char(&mut self, expected: char) -> Result<(), ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some(ch) if ch == expected => {
                self.advance();
                Ok(())
            }
            Some(ch) => Err(ParseError {
                message: format!("expected '{}', found '{}'", expected, ch),
                position: self.pos,
            }),
            None => Err(ParseError {
                message: format!("expected '{}', found end of input", expected),
                position: self.pos,
            }),
        }
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        let remaining = self.remaining();
        remaining.starts_with(keyword)
            && (remaining.len() == keyword.len()
                || !remaining[keyword.len()..]
                    .chars()
                    .next()
                    .map(|c| c.is_alphanumeric() || c == '_')
                    .unwrap_or(false))
    }

    fn consume_keyword(&mut self, keyword: &str) -> bool {
        if self.peek_keyword(keyword) {
            self.pos += keyword.len();
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<(), ParseError> {
        if self.consume_keyword(keyword) {
            Ok(())
        } else {
            let found = self.peek_word();
            Err(ParseError {
                message: format!("expected '{}', found '{}'", keyword, found),
                position: self.pos,
            })
        }
    }

    fn peek_word(&self) -> String {
        let mut word = String::new();
        for ch in self.remaining().chars() {
            if ch.is_alphanumeric() || ch == '_' {
                word.push(ch);
            } else {
                break;
            }
        }
        if word.is_empty() {
            self.peek()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "end of input".to_string())
        } else {
            word
        }
    }

    fn parse_number(&mut self) -> Result<f64, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        let mut has_dot = false;
        let mut digits = 0;

        if self.peek() == Some('-') {
            self.advance();
        }

        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                digits += 1;
                self.advance();
            } else if ch == '.' && !has_dot {
                has_dot = true;
                self.advance();
            } else {
                break;
            }
        }

        if digits == 0 {
            return Err(ParseError {
                message: "expected number".to_string(),
                position: start,
            });
        }

        let num_str = &self.input[start..self.pos];
        num_str.parse::<f64>().map_err(|_| ParseError {
            message: format!("invalid number: {}", num_str),
            position: start,
        })
    }

    fn parse_identifier(&mut self) -> Option<String> {
        let start = self.pos;
        match self.peek() {
            Some(ch) if ch.is_ascii_lowercase() => {}
            _ => return None,
        }
        while let Some(ch) = self.peek() {
            if ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_' {
                self.advance();
            } else {
                break;
            }
        }
        Some(self.input[start..self.pos].to_string())
    }

    fn parse_operand(&mut self) -> Result<Operand, ParseError> {
        self.skip_whitespace();

        if self
            .peek()
            .is_some_and(|ch| ch.is_ascii_digit() || ch == '-' || ch == '.')
        {
            let num = self.parse_number()?;
            return Ok(Operand::Constant(num));
        }

        if self.peek() == Some('$') {
            self.advance();
            let position = self.pos;
            return self
                .parse_identifier()
                .map(Operand::Param)
                .ok_or_else(|| ParseError {
                    message: format!("expected parameter name, found '{}'", self.peek_word()),
                    position,
                });
        }

        if self.consume_keyword("MUL") {
            self.expect_char('(')?;
            let left = self.parse_operand()?;
            self.expect_char(',')?;
            let right = self.parse_operand()?;
            self.expect_char(')')?;
            return Ok(Operand::Product(Box::new(left), Box::new(right)));
        }

        let position = self.pos;
        self.parse_identifier()
            .map(Operand::Column)
            .ok_or_else(|| ParseError {
                message: format!("expected operand, found '{}'", self.peek_word()),
                position,
            })
    }

    fn parse_comparison(&mut self, keyword: &str) -> Result<Rule, ParseError> {
        let position = self.pos;
        self.expect_keyword(keyword)?;
        self.expect_char('(')?;

        let left = self.parse_operand()?;
        self.expect_char(',')?;
        let right = self.parse_operand()?;
        self.expect_char(')')?;

        match keyword {
            "CROSS_ABOVE" => Ok(Rule::CrossAbove { left, right }),
            "CROSS_BELOW" => Ok(Rule::CrossBelow { left, right }),
            "ABOVE" => Ok(Rule::Above { left, right }),
            "BELOW" => Ok(Rule::Below { left, right }),
            other => Err(ParseError {
                message: format!("unknown comparison '{}'", other),
                position,
            }),
        }
    }

    fn parse_between(&mut self) -> Result<Rule, ParseError> {
        self.expect_keyword("BETWEEN")?;
        self.expect_char('(')?;

        let operand = self.parse_operand()?;
        self.expect_char(',')?;
        let lower = self.parse_operand()?;
        self.expect_char(',')?;
        let upper = self.parse_operand()?;
        self.expect_char(')')?;

        Ok(Rule::Between {
            operand,
            lower,
            upper,
        })
    }

    fn parse_rule(&mut self) -> Result<Rule, ParseError> {
        self.skip_whitespace();

        for keyword in ["CROSS_ABOVE", "CROSS_BELOW", "ABOVE", "BELOW"] {
            if self.peek_keyword(keyword) {
                return self.parse_comparison(keyword);
            }
        }
        if self.peek_keyword("BETWEEN") {
            return self.parse_between();
        }
        if self.peek_keyword("AND") {
            return self.parse_list("AND").map(Rule::And);
        }
        if self.peek_keyword("OR") {
            return self.parse_list("OR").map(Rule::Or);
        }
        if self.peek_keyword("NOT") {
            return self.parse_not();
        }

        let word = self.peek_word();
        Err(ParseError {
            message: format!("expected rule, found '{}'", word),
            position: self.pos,
        })
    }

    fn parse_list(&mut self, keyword: &str) -> Result<Vec<Rule>, ParseError> {
        self.expect_keyword(keyword)?;
        self.expect_char('(')?;

        let mut rules = Vec::new();
        rules.push(self.parse_rule()?);

        loop {
            self.skip_whitespace();
            if self.peek() == Some(')') {
                self.advance();
                break;
            }
            self.expect_char(',')?;
            rules.push(self.parse_rule()?);
        }

        if rules.len() < 2 {
            return Err(ParseError {
                message: format!("{} requires at least 2 rules", keyword),
                position: self.pos,
            });
        }

        Ok(rules)
    }

    fn parse_not(&mut self) -> Result<Rule, ParseError> {
        self.expect_keyword("NOT")?;
        self.expect_char('(')?;
        let rule = self.parse_rule()?;
        self.expect_char(')')?;
        Ok(Rule::Not(Box::new(rule)))
    }

    fn parse(&mut self) -> Result<Rule, ParseError> {
        let rule = self.parse_rule()?;
        self.skip_whitespace();
        if self.pos < self.input.len() {
            return Err(ParseError {
                message: format!("unexpected input after rule: '{}'", self.remaining()),
                position: self.pos,
            });
        }
        Ok(rule)
    }
}

pub fn parse(input: &str) -> Result<Rule, ParseError> {
    let mut parser = Parser::new(input);
    parser.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(name: &str) -> Operand {
        Operand::Column(name.into())
    }

    #[test]
    fn parse_above() {
        let rule = parse("ABOVE(close, 100)").unwrap();
        assert_eq!(
            rule,
            Rule::Above {
                left: col("close"),
                right: Operand::Constant(100.0)
            }
        );
    }

    #[test]
    fn parse_below_with_param() {
        let rule = parse("BELOW(rsi, $buy_rsi_1)").unwrap();
        assert_eq!(
            rule,
            Rule::Below {
                left: col("rsi"),
                right: Operand::Param("buy_rsi_1".into())
            }
        );
    }

    #[test]
    fn parse_informative_column() {
        let rule = parse("ABOVE(rsi_1h, $sell_rsi_1h_7)").unwrap();
        assert!(rule.columns().contains("rsi_1h"));
    }

    #[test]
    fn parse_product() {
        let rule = parse("ABOVE(volume, MUL(volume_mean_4, $buy_volume_2))").unwrap();
        match rule {
            Rule::Above { right, .. } => assert_eq!(
                right,
                Operand::Product(
                    Box::new(col("volume_mean_4")),
                    Box::new(Operand::Param("buy_volume_2".into()))
                )
            ),
            _ => panic!("expected Above rule"),
        }
    }

    #[test]
    fn parse_cross_above() {
        let rule = parse("CROSS_ABOVE(macd, macdsignal)").unwrap();
        assert!(matches!(rule, Rule::CrossAbove { .. }));
    }

    #[test]
    fn parse_cross_below() {
        let rule = parse("CROSS_BELOW(close, sar)").unwrap();
        assert!(matches!(rule, Rule::CrossBelow { .. }));
    }

    #[test]
    fn parse_between() {
        let rule = parse("BETWEEN(ewo, $ewo_low, 6.5)").unwrap();
        assert_eq!(
            rule,
            Rule::Between {
                operand: col("ewo"),
                lower: Operand::Param("ewo_low".into()),
                upper: Operand::Constant(6.5),
            }
        );
    }

    #[test]
    fn parse_and_or_not() {
        let rule = parse("AND(ABOVE(close, 1), OR(BELOW(rsi, 30), NOT(ABOVE(mfi, 50))))").unwrap();
        let Rule::And(children) = rule else {
            panic!("expected AND");
        };
        assert_eq!(children.len(), 2);
        assert!(matches!(children[1], Rule::Or(ref inner) if inner.len() == 2));
    }

    #[test]
    fn parse_variadic_and() {
        let rule = parse(
            "AND(BELOW(close, sma_offset_buy), BELOW(rsi, $buy_rsi_1), BELOW(mfi, $buy_mfi_1))",
        )
        .unwrap();
        assert!(matches!(rule, Rule::And(ref r) if r.len() == 3));
    }

    #[test]
    fn parse_whitespace_handling() {
        let rule = parse("  ABOVE (  close ,\n 100 )  ").unwrap();
        assert!(matches!(rule, Rule::Above { .. }));
    }

    #[test]
    fn parse_negative_and_float_numbers() {
        let rule = parse("BELOW(ewo, -20.5)").unwrap();
        assert!(matches!(
            rule,
            Rule::Below {
                right: Operand::Constant(v),
                ..
            } if v == -20.5
        ));
        assert!(parse("ABOVE(bbpercent, .5)").is_ok());
    }

    #[test]
    fn display_round_trips() {
        let text = "AND(BELOW(close, ema_offset_buy), ABOVE(volume, MUL(volume_mean_4, 2.6)))";
        assert_eq!(parse(text).unwrap().to_string(), text);
    }

    #[test]
    fn error_unexpected_token() {
        let err = parse("ABOVE(close; 100)").unwrap_err();
        assert!(err.message.contains("expected ','"));
        assert_eq!(err.position, 11);
    }

    #[test]
    fn error_missing_paren() {
        assert!(parse("ABOVE(close, 100").is_err());
    }

    #[test]
    fn error_invalid_rule() {
        let err = parse("FOO(close, 1)").unwrap_err();
        assert!(err.message.contains("expected rule"));
    }

    #[test]
    fn error_trailing_input() {
        let err = parse("ABOVE(close, 1) extra").unwrap_err();
        assert!(err.message.contains("unexpected input"));
    }

    #[test]
    fn error_single_child_and() {
        let err = parse("AND(ABOVE(close, 1))").unwrap_err();
        assert!(err.message.contains("at least 2"));
    }

    #[test]
    fn error_bad_param_name() {
        let err = parse("ABOVE(close, $)").unwrap_err();
        assert!(err.message.contains("parameter name"));
    }

    #[test]
    fn error_upper_case_column() {
        assert!(parse("ABOVE(Close, 1)").is_err());
    }

    #[test]
    fn case_sensitive_keywords() {
        assert!(parse("above(close, 1)").is_err());
    }

    #[test]
    fn error_display_with_context() {
        let input = "BELOW(rsi 30)";
        let err = parse(input).unwrap_err();
        let shown = err.display_with_context(input);
        assert!(shown.starts_with(input));
        assert!(shown.contains('^'));
    }

    #[test]
    fn error_empty_input() {
        assert!(parse("").is_err());
        assert!(parse("   ").is_err());
    }
}
