//! Style-string tokenizer and renderer
//!
//! A style such as `{ShowName} - S{Season:2}E{Episode}[-E{Episode2}]` is
//! parsed once into a list of nodes:
//!
//! - literal text
//! - a token (`{...}`, matched case-insensitively)
//! - an optional segment (`[...]`), rendered only for multi-episode spans
//!
//! `\[` and `\]` always produce literal brackets. Optional segments do not
//! nest; a `[` inside one is literal text. Unknown tokens and unterminated
//! brackets are kept as literal text by [`NameTemplate::parse`] and rejected
//! by [`NameTemplate::parse_strict`].

use chrono::NaiveDate;
use std::borrow::Cow;
use std::fmt;

use crate::context::EpisodeContext;
use crate::error::{NamingError, Result};
use crate::presets::DEFAULT_STYLE;

/// Placeholder a style string may contain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Token {
    ShowName,
    Season,
    /// Season zero-padded to two digits
    Season2,
    /// First episode of the span, zero-padded to two digits
    Episode,
    /// Last episode of the span, zero-padded to two digits
    Episode2,
    EpisodeName,
    Number,
    Number2,
    Number3,
    ShortDate,
    LongDate,
    YmdDate,
    /// `E01E02E03` across the span
    AllEpisodes,
}

const TOKEN_TAGS: &[(Token, &str)] = &[
    (Token::ShowName, "{ShowName}"),
    (Token::Season, "{Season}"),
    (Token::Season2, "{Season:2}"),
    (Token::Episode, "{Episode}"),
    (Token::Episode2, "{Episode2}"),
    (Token::EpisodeName, "{EpisodeName}"),
    (Token::Number, "{Number}"),
    (Token::Number2, "{Number:2}"),
    (Token::Number3, "{Number:3}"),
    (Token::ShortDate, "{ShortDate}"),
    (Token::LongDate, "{LongDate}"),
    (Token::YmdDate, "{YMDDate}"),
    (Token::AllEpisodes, "{AllEpisodes}"),
];

/// Every tag a style string may use, in display order.
pub const TAGS: &[&str] = &[
    "{ShowName}",
    "{Season}",
    "{Season:2}",
    "{Episode}",
    "{Episode2}",
    "{EpisodeName}",
    "{Number}",
    "{Number:2}",
    "{Number:3}",
    "{ShortDate}",
    "{LongDate}",
    "{YMDDate}",
    "{AllEpisodes}",
];

impl Token {
    /// Look up the token for a tag body (the text between the braces).
    pub fn from_body(body: &str) -> Option<Token> {
        TOKEN_TAGS.iter().find_map(|(token, tag)| {
            tag[1..tag.len() - 1]
                .eq_ignore_ascii_case(body)
                .then_some(*token)
        })
    }

    pub fn tag(&self) -> &'static str {
        TOKEN_TAGS
            .iter()
            .find(|(token, _)| token == self)
            .map(|(_, tag)| *tag)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    Literal(String),
    Token(Token),
    Optional(Vec<Node>),
}

/// Rendering switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Percent-encode names and dates, e.g. when building a search URL
    pub url_encode: bool,
}

/// A parsed naming style
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameTemplate {
    style: String,
    nodes: Vec<Node>,
}

struct Parser<'a> {
    style: &'a str,
    chars: Vec<char>,
    strict: bool,
}

impl<'a> Parser<'a> {
    fn new(style: &'a str, strict: bool) -> Self {
        Self {
            style,
            chars: style.chars().collect(),
            strict,
        }
    }

    fn parse(&self) -> Result<Vec<Node>> {
        self.parse_range(0, self.chars.len(), true)
    }

    fn parse_range(&self, start: usize, end: usize, allow_optional: bool) -> Result<Vec<Node>> {
        let chars = &self.chars;
        let mut nodes = Vec::new();
        let mut literal = String::new();
        let mut i = start;

        while i < end {
            let c = chars[i];

            if c == '\\' && i + 1 < end && matches!(chars[i + 1], '[' | ']') {
                literal.push(chars[i + 1]);
                i += 2;
                continue;
            }

            if c == '[' && allow_optional {
                match self.find_close(i + 1, end) {
                    Some(close) => {
                        flush(&mut literal, &mut nodes);
                        nodes.push(Node::Optional(self.parse_range(i + 1, close, false)?));
                        i = close + 1;
                        continue;
                    }
                    None if self.strict => return Err(self.unbalanced(i)),
                    None => {}
                }
            } else if c == ']' && allow_optional && self.strict {
                return Err(self.unbalanced(i));
            }

            if c == '{' {
                if let Some(close) = (i + 1..end).find(|&j| chars[j] == '}') {
                    let body: String = chars[i + 1..close].iter().collect();
                    match Token::from_body(&body) {
                        Some(token) => {
                            flush(&mut literal, &mut nodes);
                            nodes.push(Node::Token(token));
                            i = close + 1;
                            continue;
                        }
                        None if self.strict => {
                            return Err(NamingError::UnknownToken {
                                token: body,
                                style: self.style.to_string(),
                            })
                        }
                        None => {}
                    }
                }
            }

            literal.push(c);
            i += 1;
        }

        flush(&mut literal, &mut nodes);
        Ok(nodes)
    }

    /// Position of the next `]` not preceded by a backslash.
    fn find_close(&self, from: usize, end: usize) -> Option<usize> {
        (from..end).find(|&j| self.chars[j] == ']' && (j == 0 || self.chars[j - 1] != '\\'))
    }

    fn unbalanced(&self, position: usize) -> NamingError {
        NamingError::UnbalancedBracket {
            position,
            style: self.style.to_string(),
        }
    }
}

fn flush(literal: &mut String, nodes: &mut Vec<Node>) {
    if !literal.is_empty() {
        nodes.push(Node::Literal(std::mem::take(literal)));
    }
}

impl NameTemplate {
    /// Parse a style leniently: anything unrecognised stays literal text.
    pub fn parse(style: &str) -> Self {
        let nodes = Parser::new(style, false)
            .parse()
            .unwrap_or_else(|_| vec![Node::Literal(style.to_string())]);
        Self {
            style: style.to_string(),
            nodes,
        }
    }

    /// Parse a style, rejecting unknown tokens and unbalanced brackets.
    ///
    /// # Errors
    ///
    /// [`NamingError::UnknownToken`] or [`NamingError::UnbalancedBracket`].
    pub fn parse_strict(style: &str) -> Result<Self> {
        let nodes = Parser::new(style, true).parse()?;
        Ok(Self {
            style: style.to_string(),
            nodes,
        })
    }

    pub fn style(&self) -> &str {
        &self.style
    }

    /// Whether the style uses `token` anywhere, including optional segments.
    pub fn uses(&self, token: Token) -> bool {
        fn walk(nodes: &[Node], token: Token) -> bool {
            nodes.iter().any(|node| match node {
                Node::Token(t) => *t == token,
                Node::Optional(inner) => walk(inner, token),
                Node::Literal(_) => false,
            })
        }
        walk(&self.nodes, token)
    }

    /// Render against `ctx`. The result is trimmed.
    pub fn render(&self, ctx: &EpisodeContext) -> String {
        self.render_with(ctx, RenderOptions::default())
    }

    pub fn render_with(&self, ctx: &EpisodeContext, options: RenderOptions) -> String {
        let mut out = String::new();
        render_nodes(&self.nodes, ctx, options, &mut out);
        out.trim().to_string()
    }

    /// Render a file name with `extension`, keeping the whole path within
    /// `max_total` characters.
    ///
    /// `folder_length` is the length of the folder the file will live in.
    /// The rendered name is cut to `max_total - (folder_length + extension)`
    /// characters and the extension is appended afterwards, with a leading
    /// `.` added when missing.
    pub fn name_for_ext(
        &self,
        ctx: &EpisodeContext,
        extension: &str,
        folder_length: usize,
        max_total: usize,
    ) -> String {
        let extension = dotted(extension);
        let budget = max_total.saturating_sub(folder_length + extension.chars().count());
        let mut name = truncate_chars(&self.render(ctx), budget).to_string();
        name.push_str(&extension);
        name
    }
}

impl Default for NameTemplate {
    fn default() -> Self {
        Self::parse(DEFAULT_STYLE)
    }
}

impl From<&str> for NameTemplate {
    fn from(style: &str) -> Self {
        Self::parse(style)
    }
}

impl fmt::Display for NameTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.style)
    }
}

fn dotted(extension: &str) -> Cow<'_, str> {
    if extension.is_empty() || extension.starts_with('.') {
        Cow::Borrowed(extension)
    } else {
        Cow::Owned(format!(".{}", extension))
    }
}

/// Longest prefix of `text` with at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

fn render_nodes(nodes: &[Node], ctx: &EpisodeContext, options: RenderOptions, out: &mut String) {
    for node in nodes {
        match node {
            Node::Literal(text) => out.push_str(text),
            Node::Token(token) => out.push_str(&token_value(*token, ctx, options)),
            Node::Optional(inner) => {
                if ctx.is_multi_episode() {
                    render_nodes(inner, ctx, options, out);
                }
            }
        }
    }
}

fn encoded(text: String, options: RenderOptions) -> String {
    if options.url_encode {
        urlencoding::encode(&text).into_owned()
    } else {
        text
    }
}

fn format_date(date: Option<NaiveDate>, format: &str, missing: &str) -> String {
    match date {
        Some(date) => date.format(format).to_string(),
        None => missing.to_string(),
    }
}

fn token_value(token: Token, ctx: &EpisodeContext, options: RenderOptions) -> String {
    match token {
        Token::ShowName => encoded(ctx.show_name.clone(), options),
        Token::Season => ctx.season.to_string(),
        Token::Season2 => format!("{:02}", ctx.season),
        Token::Episode => format!("{:02}", ctx.episode),
        Token::Episode2 => format!("{:02}", ctx.episode2),
        Token::EpisodeName => encoded(ctx.episode_name.clone(), options),
        Token::Number => ctx
            .overall_number
            .map(|n| n.to_string())
            .unwrap_or_default(),
        Token::Number2 => ctx
            .overall_number
            .map(|n| format!("{:02}", n))
            .unwrap_or_default(),
        Token::Number3 => ctx
            .overall_number
            .map(|n| format!("{:03}", n))
            .unwrap_or_default(),
        Token::ShortDate => encoded(format_date(ctx.air_date, "%Y-%m-%d", "---"), options),
        Token::LongDate => encoded(format_date(ctx.air_date, "%-d %B %Y", "------"), options),
        Token::YmdDate => encoded(format_date(ctx.air_date, "%Y/%m/%d", "----/--/--"), options),
        Token::AllEpisodes => {
            let last = ctx.episode2.max(ctx.episode);
            (ctx.episode..=last).map(|e| format!("E{:02}", e)).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(episode: u32, episode2: u32) -> EpisodeContext {
        EpisodeContext::single("Firefly", 1, episode, "Serenity").with_episode2(episode2)
    }

    #[test]
    fn test_optional_segment_single_and_pair() {
        let template = NameTemplate::parse("S{Season:2}E{Episode}[-E{Episode2}]");
        assert_eq!(template.render(&ctx(1, 1)), "S01E01");
        assert_eq!(template.render(&ctx(1, 2)), "S01E01-E02");
    }

    #[test]
    fn test_tokens_are_case_insensitive() {
        let template = NameTemplate::parse("{showname} {SEASON:2}x{episode}");
        assert_eq!(template.render(&ctx(3, 3)), "Firefly 01x03");
    }

    #[test]
    fn test_escaped_brackets_always_literal() {
        let template = NameTemplate::parse(r"\[{ShowName}\] E{Episode}[-E{Episode2}]");
        assert_eq!(template.render(&ctx(4, 4)), "[Firefly] E04");
        assert_eq!(template.render(&ctx(4, 5)), "[Firefly] E04-E05");
    }

    #[test]
    fn test_unknown_token_and_unterminated_bracket_stay_literal() {
        let template = NameTemplate::parse("{Bogus} [E{Episode}");
        assert_eq!(template.render(&ctx(1, 1)), "{Bogus} [E01");
    }

    #[test]
    fn test_no_recursive_expansion() {
        let template = NameTemplate::parse("{EpisodeName}");
        let ctx = EpisodeContext::single("Show", 1, 1, "{ShowName}");
        assert_eq!(template.render(&ctx), "{ShowName}");
    }

    #[test]
    fn test_parse_strict_rejects_unknown_token() {
        let err = NameTemplate::parse_strict("{ShowName} {Resolution}").unwrap_err();
        assert_eq!(
            err,
            NamingError::UnknownToken {
                token: "Resolution".to_string(),
                style: "{ShowName} {Resolution}".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_strict_rejects_unbalanced_brackets() {
        assert!(matches!(
            NameTemplate::parse_strict("E{Episode}[-E{Episode2}"),
            Err(NamingError::UnbalancedBracket { position: 10, .. })
        ));
        assert!(matches!(
            NameTemplate::parse_strict("E{Episode}]"),
            Err(NamingError::UnbalancedBracket { .. })
        ));
        assert!(NameTemplate::parse_strict(r"E{Episode} \]").is_ok());
    }

    #[test]
    fn test_all_episodes_and_numbers() {
        let template = NameTemplate::parse("S{Season:2}{AllEpisodes} #{Number:3} ({Number})");
        let ctx = ctx(2, 4).with_overall_number(7);
        assert_eq!(template.render(&ctx), "S01E02E03E04 #007 (7)");
    }

    #[test]
    fn test_dates_and_placeholders() {
        let template = NameTemplate::parse("{ShortDate}|{LongDate}|{YMDDate}");
        assert_eq!(template.render(&ctx(1, 1)), "---|------|----/--/--");

        let dated = ctx(1, 1).with_air_date(NaiveDate::from_ymd_opt(2002, 9, 20).unwrap());
        assert_eq!(template.render(&dated), "2002-09-20|20 September 2002|2002/09/20");
    }

    #[test]
    fn test_url_encoding() {
        let template = NameTemplate::parse("{ShowName}/{YMDDate}");
        let ctx = EpisodeContext::single("Law & Order", 1, 1, "")
            .with_air_date(NaiveDate::from_ymd_opt(1990, 9, 13).unwrap());
        let rendered = template.render_with(&ctx, RenderOptions { url_encode: true });
        assert_eq!(rendered, "Law%20%26%20Order/1990%2F09%2F13");
    }

    #[test]
    fn test_result_is_trimmed() {
        let template = NameTemplate::parse("  {ShowName}[ pt2]  ");
        assert_eq!(template.render(&ctx(1, 1)), "Firefly");
    }

    #[test]
    fn test_render_is_pure() {
        let template = NameTemplate::default();
        let ctx = ctx(1, 2);
        assert_eq!(template.render(&ctx), template.render(&ctx));
        assert_eq!(template.render(&ctx), "Firefly - S01E01-E02 - Serenity");
    }

    #[test]
    fn test_name_for_ext_truncates_before_extension() {
        let template = NameTemplate::default();
        let ctx = ctx(1, 1);
        let full = template.render(&ctx);

        let name = template.name_for_ext(&ctx, "mkv", 180, 200);
        let budget = 200 - (180 + ".mkv".len());
        assert_eq!(name.chars().count(), budget + 4);
        assert!(name.ends_with(".mkv"));
        assert!(full.starts_with(&name[..name.len() - 4]));
    }

    #[test]
    fn test_name_for_ext_without_truncation() {
        let template = NameTemplate::default();
        assert_eq!(
            template.name_for_ext(&ctx(1, 1), ".mkv", 10, 200),
            "Firefly - S01E01 - Serenity.mkv"
        );
        assert_eq!(
            template.name_for_ext(&ctx(1, 1), "", 10, 200),
            "Firefly - S01E01 - Serenity"
        );
    }

    #[test]
    fn test_name_for_ext_folder_exceeds_budget() {
        let template = NameTemplate::default();
        assert_eq!(template.name_for_ext(&ctx(1, 1), "mkv", 250, 200), ".mkv");
    }

    #[test]
    fn test_truncate_chars_respects_utf8() {
        assert_eq!(truncate_chars("Amélie", 3), "Amé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abc", 0), "");
    }

    #[test]
    fn test_uses_and_tags() {
        let template = NameTemplate::parse("E{Episode}[-E{Episode2}]");
        assert!(template.uses(Token::Episode2));
        assert!(!template.uses(Token::ShowName));
        assert_eq!(Token::YmdDate.tag(), "{YMDDate}");
        assert_eq!(Token::from_body("number:2"), Some(Token::Number2));
        assert_eq!(TAGS.len(), TOKEN_TAGS.len());
    }
}
