// Wire frame codec.
//
// Every message is a 3-element JSON array `[tag, reserved, [keyword, payload?]]`.
// `tag` is null for handshake control frames and "enc" for encrypted
// command envelopes. Bodies are compact JSON with every space removed,
// including spaces inside string values; the controller rejects anything else.

use serde::Serialize;
use serde_json::{Value, json};

use crate::error::Error;

/// Tag carried by encrypted envelopes.
pub const ENC_TAG: &str = "enc";

/// Command keywords understood by the controller.
pub mod keyword {
    pub const SYS_INFO: &str = "sys_info";
    pub const LOGIN: &str = "login";
    pub const POINT_LIST: &str = "mplist";
    pub const OPERATE: &str = "op";
}

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// `Some("enc")` for encrypted envelopes, `None` for control frames.
    pub tag: Option<String>,
    pub keyword: String,
    pub payload: Option<Value>,
}

impl Frame {
    /// Parse a raw text frame, returning `None` for anything that is not a
    /// well-formed `[tag, _, [keyword, payload?]]` array.
    pub fn parse(text: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(text).ok()?;
        let outer = value.as_array()?;
        if outer.len() < 3 {
            return None;
        }
        let tag = outer.first()?.as_str().map(String::from);
        let body = outer.get(2)?.as_array()?;
        let keyword = body.first()?.as_str()?.to_owned();
        let payload = body.get(1).cloned();
        Some(Self {
            tag,
            keyword,
            payload,
        })
    }

    pub fn is_encrypted(&self) -> bool {
        self.tag.as_deref() == Some(ENC_TAG)
    }

    /// The payload as a hex ciphertext string.
    pub fn ciphertext(&self) -> Result<&str, Error> {
        self.payload
            .as_ref()
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Deserialization {
                message: format!("'{}' envelope has no ciphertext payload", self.keyword),
                body: self.payload.as_ref().map(Value::to_string).unwrap_or_default(),
            })
    }
}

/// Raw keyword check used to pick the reply out of the inbound stream.
///
/// Plain substring containment on the undecoded frame text. The controller
/// sends no request ids, and one request is in flight at a time.
pub fn mentions(text: &str, keyword: &str) -> bool {
    text.contains(keyword)
}

/// `[null, null, [keyword, payload]]`
pub fn control(keyword: &str, payload: &str) -> String {
    json!([null, null, [keyword, payload]]).to_string()
}

/// `["enc", null, [keyword]]` or `["enc", null, [keyword, ciphertext]]`
pub fn envelope(keyword: &str, ciphertext: Option<&str>) -> String {
    match ciphertext {
        Some(hex) => json!([ENC_TAG, null, [keyword, hex]]).to_string(),
        None => json!([ENC_TAG, null, [keyword]]).to_string(),
    }
}

/// Serialize a body in the controller's compact form: no space characters
/// anywhere, values included.
pub fn compact<T: Serialize + ?Sized>(body: &T) -> Result<String, Error> {
    let text = serde_json::to_string(body).map_err(|e| Error::Deserialization {
        message: format!("failed to serialize body: {e}"),
        body: String::new(),
    })?;
    Ok(text.replace(' ', ""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_point_list_query() {
        insta::assert_snapshot!(envelope(keyword::POINT_LIST, None), @r#"["enc",null,["mplist"]]"#);
    }

    #[test]
    fn builds_encrypted_envelope() {
        insta::assert_snapshot!(
            envelope(keyword::OPERATE, Some("a1b2")),
            @r#"["enc",null,["op","a1b2"]]"#
        );
    }

    #[test]
    fn control_frame_escapes_pem_newlines() {
        let frame = control(keyword::SYS_INFO, "-----BEGIN-----\nAAA\n-----END-----\n");
        assert_eq!(
            frame,
            r#"[null,null,["sys_info","-----BEGIN-----\nAAA\n-----END-----\n"]]"#
        );
    }

    #[test]
    fn compact_bodies_have_no_separator_whitespace() {
        let body = json!({"name": "admin", "passwd": "secret", "uuid": null});
        let text = compact(&body).unwrap();
        assert!(!text.contains(' '));
        assert_eq!(text, r#"{"name":"admin","passwd":"secret","uuid":null}"#);
    }

    #[test]
    fn compact_bodies_strip_spaces_inside_values() {
        let body = json!({"p1": {"name": "Living Room", "stat": "on"}});
        assert_eq!(compact(&body).unwrap(), r#"{"p1":{"name":"LivingRoom","stat":"on"}}"#);
    }

    #[test]
    fn parses_encrypted_reply() {
        let frame = Frame::parse(r#"["enc",null,["mplist","deadbeef"]]"#).unwrap();
        assert!(frame.is_encrypted());
        assert_eq!(frame.keyword, "mplist");
        assert_eq!(frame.ciphertext().unwrap(), "deadbeef");
    }

    #[test]
    fn parses_control_frame_with_object_payload() {
        let frame = Frame::parse(r#"[null,null,["sys_info",{"common_key":"QUJD"}]]"#).unwrap();
        assert!(!frame.is_encrypted());
        assert_eq!(frame.keyword, "sys_info");
        assert_eq!(frame.payload.unwrap()["common_key"], "QUJD");
    }

    #[test]
    fn rejects_malformed_frames() {
        assert!(Frame::parse("not json").is_none());
        assert!(Frame::parse(r#"{"a":1}"#).is_none());
        assert!(Frame::parse(r#"["enc",null]"#).is_none());
        assert!(Frame::parse(r#"["enc",null,"mplist"]"#).is_none());
        assert!(Frame::parse(r#"["enc",null,[]]"#).is_none());
        assert!(Frame::parse(r#"["enc",null,[42]]"#).is_none());
    }

    #[test]
    fn missing_ciphertext_is_a_deserialization_error() {
        let frame = Frame::parse(r#"["enc",null,["op"]]"#).unwrap();
        assert!(matches!(
            frame.ciphertext(),
            Err(Error::Deserialization { .. })
        ));
    }

    #[test]
    fn keyword_match_is_substring_containment() {
        assert!(mentions(r#"["enc",null,["mplist","00"]]"#, "mplist"));
        assert!(mentions(r#"["enc",null,["op","00"]]"#, "op"));
        assert!(!mentions(r#"["enc",null,["notice","00"]]"#, "op"));
    }
}
