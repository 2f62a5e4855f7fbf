//! nom parsers for SIP URIs, name-addr values and comma-separated header lists
//!
//! Grammar from RFC 3261 section 25.1, reduced to what routing needs:
//!
//! ```text
//! SIP-URI    = "sip:" [ userinfo ] hostport uri-parameters [ headers ]
//! userinfo   = user [ ":" password ] "@"
//! name-addr  = [ display-name ] LAQUOT addr-spec RAQUOT
//! ```

use nom::{
    branch::alt,
    bytes::complete::{tag_no_case, take_while, take_while1},
    character::complete::{anychar, char, digit1, space0},
    combinator::{all_consuming, map, map_res, opt, recognize, value},
    multi::{many0, separated_list0},
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};

use super::uri::{Scheme, SipUri};
use crate::common::errors::{OutboundError, Result};

type ParseResult<'a, O> = IResult<&'a str, O>;

// unreserved = alphanum / mark
// mark       = "-" / "_" / "." / "!" / "~" / "*" / "'" / "(" / ")"
fn is_unreserved(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '!' | '~' | '*' | '\'' | '(' | ')')
}

// user-unreserved = "&" / "=" / "+" / "$" / "," / ";" / "?" / "/"
fn is_user_char(c: char) -> bool {
    is_unreserved(c) || matches!(c, '%' | '&' | '=' | '+' | '$' | ',' | ';' | '?' | '/')
}

fn is_password_char(c: char) -> bool {
    is_unreserved(c) || matches!(c, '%' | '&' | '=' | '+' | '$' | ',')
}

// paramchar = param-unreserved / unreserved / escaped
fn is_param_char(c: char) -> bool {
    is_unreserved(c) || matches!(c, '%' | '[' | ']' | '/' | ':' | '&' | '+' | '$')
}

fn is_host_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '.'
}

/// Decode escapes of unreserved characters and upper-case the hex of all others, so
/// that equivalent spellings of a user part compare equal (RFC 3261 section 19.1.4)
fn normalize_escapes(input: &str) -> std::result::Result<String, &'static str> {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        let hex: String = chars.by_ref().take(2).collect();
        if hex.len() != 2 || !hex.chars().all(|h| h.is_ascii_hexdigit()) {
            return Err("malformed escape");
        }
        let byte = u8::from_str_radix(&hex, 16).map_err(|_| "malformed escape")?;
        if byte.is_ascii() && is_unreserved(byte as char) {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    Ok(out)
}

fn scheme(input: &str) -> ParseResult<Scheme> {
    terminated(
        alt((
            value(Scheme::Sips, tag_no_case("sips")),
            value(Scheme::Sip, tag_no_case("sip")),
        )),
        char(':'),
    )(input)
}

fn userinfo(input: &str) -> ParseResult<(String, Option<String>)> {
    terminated(
        pair(
            map_res(take_while1(is_user_char), normalize_escapes),
            opt(preceded(char(':'), map_res(take_while(is_password_char), normalize_escapes))),
        ),
        char('@'),
    )(input)
}

// host = hostname / IPv4address / IPv6reference
fn host(input: &str) -> ParseResult<&str> {
    alt((
        recognize(tuple((
            char('['),
            take_while1(|c: char| c.is_ascii_hexdigit() || c == ':' || c == '.'),
            char(']'),
        ))),
        take_while1(is_host_char),
    ))(input)
}

fn port(input: &str) -> ParseResult<u16> {
    preceded(char(':'), map_res(digit1, |digits: &str| digits.parse::<u16>()))(input)
}

fn uri_param(input: &str) -> ParseResult<(String, Option<String>)> {
    preceded(
        char(';'),
        pair(
            map(take_while1(is_param_char), str::to_string),
            opt(preceded(char('='), map(take_while(is_param_char), str::to_string))),
        ),
    )(input)
}

/// SIP-URI / SIPS-URI. URI headers are consumed and dropped.
fn sip_uri(input: &str) -> ParseResult<SipUri> {
    map(
        tuple((
            scheme,
            opt(userinfo),
            host,
            opt(port),
            many0(uri_param),
            opt(preceded(char('?'), take_while(|c: char| c != '>'))),
        )),
        |(scheme, userinfo, host, port, params, _headers)| {
            let (user, password) = match userinfo {
                Some((user, password)) => (Some(user), password),
                None => (None, None),
            };
            SipUri {
                scheme,
                user,
                password,
                host: host.to_string(),
                port,
                params,
            }
        },
    )(input)
}

/// Parse a complete SIP or SIPS URI
pub fn parse_uri(input: &str) -> Result<SipUri> {
    let input = input.trim();
    all_consuming(sip_uri)(input)
        .map(|(_, uri)| uri)
        .map_err(|_| OutboundError::invalid_uri(input, "not a valid SIP or SIPS URI"))
}

// quoted-string contents, with quoted-pair
fn quoted_body(input: &str) -> ParseResult<&str> {
    recognize(many0(alt((
        recognize(pair(char('\\'), anychar)),
        take_while1(|c: char| c != '"' && c != '\\'),
    ))))(input)
}

fn quoted_string(input: &str) -> ParseResult<&str> {
    delimited(char('"'), quoted_body, char('"'))(input)
}

fn display_name(input: &str) -> ParseResult<&str> {
    alt((quoted_string, take_while(|c: char| c != '<' && c != '"')))(input)
}

// name-addr; header parameters after RAQUOT are not part of the URI
fn name_addr(input: &str) -> ParseResult<SipUri> {
    preceded(
        pair(display_name, space0),
        delimited(char('<'), sip_uri, char('>')),
    )(input)
}

/// Extract the URI from a name-addr (`"Name" <sip:...>;params`) or a bare addr-spec
pub fn parse_name_addr(value: &str) -> Result<SipUri> {
    let value = value.trim();
    alt((name_addr, all_consuming(sip_uri)))(value)
        .map(|(_, uri)| uri)
        .map_err(|_| OutboundError::invalid_header("name-addr", format!("cannot parse '{}'", value)))
}

// One list element. Quoted strings and <...> are taken whole, so commas inside them do
// not split; an unterminated one runs to the end of the value.
fn list_element(input: &str) -> ParseResult<&str> {
    recognize(many0(alt((
        recognize(tuple((char('"'), quoted_body, opt(char('"'))))),
        recognize(tuple((char('<'), take_while(|c: char| c != '>'), opt(char('>'))))),
        take_while1(|c: char| c != ',' && c != '"' && c != '<'),
    ))))(input)
}

/// Split a header value on commas that are not inside `<...>` or a quoted string
pub fn split_list(value: &str) -> Vec<String> {
    let parsed: ParseResult<Vec<&str>> = separated_list0(char(','), list_element)(value);
    let items = match parsed {
        Ok(("", items)) => items,
        _ => vec![value],
    };
    items
        .into_iter()
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escapes_are_normalized() {
        let uri = parse_uri("sip:%61lice@example.com").unwrap();
        assert_eq!(uri.user.as_deref(), Some("alice"));

        let reserved = parse_uri("sip:a%3ab@example.com").unwrap();
        assert_eq!(reserved.user.as_deref(), Some("a%3Ab"));

        assert!(parse_uri("sip:%6@example.com").is_err());
        assert!(parse_uri("sip:%zz@example.com").is_err());
    }

    #[test]
    fn test_userless_uri_with_params_and_headers() {
        let uri = parse_uri("sip:edge.example.com;addr=sip%3Abob%40example.com?x=y").unwrap();
        assert_eq!(uri.user, None);
        assert_eq!(uri.host, "edge.example.com");
        assert_eq!(uri.param("addr"), Some("sip%3Abob%40example.com"));
    }

    #[test]
    fn test_display_name_may_contain_brackets() {
        let uri = parse_name_addr(r#""Carol <desk>" <sip:carol@192.0.2.33:5062>"#).unwrap();
        assert_eq!(uri.user.as_deref(), Some("carol"));
        assert_eq!(uri.port, Some(5062));

        let token = parse_name_addr("Edge Proxy <sip:edge.example.com;lr>").unwrap();
        assert!(token.has_param("lr"));
    }

    #[test]
    fn test_split_list_with_quoted_brackets() {
        assert_eq!(
            split_list(r#""a, <b>" <sip:p1;lr>, <sip:p2;lr>"#),
            vec![r#""a, <b>" <sip:p1;lr>"#, "<sip:p2;lr>"]
        );
        assert_eq!(split_list("<sip:p1;lr, <sip:p2;lr>"), vec!["<sip:p1;lr, <sip:p2;lr>"]);
        assert_eq!(split_list(r#""open\"#), vec![r#""open\"#]);
    }
}
