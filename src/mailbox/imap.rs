//! Blocking IMAP4rev1 session over TLS.
//!
//! Speaks just enough of the protocol for this tool: `LOGIN`, `SELECT`,
//! `UID SEARCH`, `UID FETCH` of header blocks, `UID STORE` and `LOGOUT`.
//! The session is generic over its byte stream so tests can script the
//! server side.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpStream;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use regex::Regex;
use rustls_pki_types::ServerName;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::ImapError;
use crate::mailbox::{Flag, HeaderMessage, Mailbox, SearchCriteria};

/// TLS stream used for real servers.
pub type TlsStream = rustls::StreamOwned<rustls::ClientConnection, TcpStream>;

/// Maximum UIDs per `UID FETCH` command line.
pub const FETCH_CHUNK: usize = 256;

const IO_TIMEOUT: Duration = Duration::from_secs(30);

static FETCH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\* \d+ FETCH \(").expect("valid FETCH regex"));
static UID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bUID (\d+)").expect("valid UID regex"));
static EXISTS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\* (\d+) EXISTS").expect("valid EXISTS regex"));

/// One server response: its text lines joined, plus any literals it carried.
#[derive(Debug, Default)]
struct Response {
    text: String,
    literals: Vec<Vec<u8>>,
}

/// An authenticated (or about to be) IMAP connection.
pub struct ImapSession<S: Read + Write> {
    stream: BufReader<S>,
    next_tag: u32,
    logged_out: bool,
}

impl ImapSession<TlsStream> {
    /// Connect, log in and select the configured folder.
    pub fn connect(config: &Config) -> Result<Self, ImapError> {
        let mut session = Self::connect_tls(&config.server, config.port)?;
        session.login(&config.login, &config.password)?;
        let exists = session.select(&config.folder)?;
        info!(
            server = %config.server,
            folder = %config.folder,
            exists,
            "Selected IMAP folder"
        );
        Ok(session)
    }

    /// Open an implicit-TLS connection and read the greeting.
    pub fn connect_tls(host: &str, port: u16) -> Result<Self, ImapError> {
        let tcp = TcpStream::connect((host, port))?;
        tcp.set_read_timeout(Some(IO_TIMEOUT))?;
        tcp.set_write_timeout(Some(IO_TIMEOUT))?;

        let mut root_store = rustls::RootCertStore::empty();
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        let tls_config = Arc::new(
            rustls::ClientConfig::builder()
                .with_root_certificates(root_store)
                .with_no_client_auth(),
        );
        let server_name = ServerName::try_from(host.to_string())
            .map_err(|_| ImapError::InvalidServerName(host.to_string()))?;
        let conn = rustls::ClientConnection::new(tls_config, server_name)?;

        debug!(host, port, "Connected to IMAP server");
        Self::from_stream(rustls::StreamOwned::new(conn, tcp))
    }
}

impl<S: Read + Write> ImapSession<S> {
    /// Wrap an already connected stream and consume the server greeting.
    pub fn from_stream(stream: S) -> Result<Self, ImapError> {
        let mut session = Self {
            stream: BufReader::new(stream),
            next_tag: 1,
            logged_out: false,
        };

        let greeting = session.read_response()?;
        if !(greeting.text.starts_with("* OK") || greeting.text.starts_with("* PREAUTH")) {
            session.logged_out = true;
            return Err(ImapError::Greeting(greeting.text));
        }
        Ok(session)
    }

    pub fn login(&mut self, user: &str, password: &SecretString) -> Result<(), ImapError> {
        self.command(&format!(
            "LOGIN {} {}",
            quote(user),
            quote(password.expose_secret())
        ))?;
        debug!(user, "IMAP login succeeded");
        Ok(())
    }

    /// Select a folder read-write. Returns its message count.
    pub fn select(&mut self, folder: &str) -> Result<u32, ImapError> {
        let responses = self.command(&format!("SELECT {}", quote(folder)))?;
        let exists = responses
            .iter()
            .find_map(|r| EXISTS_RE.captures(&r.text))
            .and_then(|caps| caps[1].parse().ok())
            .unwrap_or(0);
        Ok(exists)
    }

    /// End the session. Safe to call more than once.
    pub fn logout(&mut self) -> Result<(), ImapError> {
        if self.logged_out {
            return Ok(());
        }
        self.logged_out = true;
        self.command("LOGOUT")?;
        debug!("IMAP session closed");
        Ok(())
    }

    /// Send a tagged command and collect untagged responses until its completion.
    fn command(&mut self, command: &str) -> Result<Vec<Response>, ImapError> {
        let tag = format!("A{}", self.next_tag);
        self.next_tag += 1;

        let writer = self.stream.get_mut();
        writer.write_all(format!("{tag} {command}\r\n").as_bytes())?;
        writer.flush()?;

        let prefix = format!("{tag} ");
        let mut untagged = Vec::new();
        loop {
            let response = self.read_response()?;
            if let Some(status) = response.text.strip_prefix(&prefix) {
                if status.starts_with("OK") {
                    return Ok(untagged);
                }
                return Err(ImapError::Command {
                    command: command_name(command),
                    response: status.to_string(),
                });
            }
            if response.text.starts_with('+') {
                return Err(ImapError::Protocol(format!(
                    "unexpected continuation during {}: {}",
                    command_name(command),
                    response.text
                )));
            }
            untagged.push(response);
        }
    }

    /// Read one response, following `{n}` literals onto continuation lines.
    fn read_response(&mut self) -> Result<Response, ImapError> {
        let mut response = Response::default();
        loop {
            let line = self.read_line()?;
            response.text.push_str(&line);

            let Some(len) = literal_len(&line) else {
                return Ok(response);
            };
            let mut literal = vec![0u8; len];
            self.stream.read_exact(&mut literal)?;
            response.literals.push(literal);
        }
    }

    fn read_line(&mut self) -> Result<String, ImapError> {
        let mut buf = Vec::new();
        if self.stream.read_until(b'\n', &mut buf)? == 0 {
            return Err(ImapError::ConnectionClosed);
        }
        while matches!(buf.last(), Some(b'\n' | b'\r')) {
            buf.pop();
        }
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

impl<S: Read + Write> Mailbox for ImapSession<S> {
    fn search(&mut self, criteria: &SearchCriteria) -> Result<Vec<u32>, ImapError> {
        let responses = self.command(&format!("UID SEARCH {}", criteria.to_imap()))?;
        let mut uids = Vec::new();
        for response in &responses {
            let Some(rest) = response.text.strip_prefix("* SEARCH") else {
                continue;
            };
            for token in rest.split_whitespace() {
                let uid = token.parse().map_err(|_| {
                    ImapError::Protocol(format!("bad UID {token:?} in SEARCH response"))
                })?;
                uids.push(uid);
            }
        }
        Ok(uids)
    }

    fn fetch_headers(&mut self, uids: &[u32]) -> Result<Vec<HeaderMessage>, ImapError> {
        let mut by_uid = HashMap::with_capacity(uids.len());

        for chunk in uids.chunks(FETCH_CHUNK) {
            let set = chunk
                .iter()
                .map(u32::to_string)
                .collect::<Vec<_>>()
                .join(",");
            let responses = self.command(&format!("UID FETCH {set} (UID BODY.PEEK[HEADER])"))?;

            for response in responses {
                if !FETCH_RE.is_match(&response.text) || !response.text.contains("BODY[HEADER]") {
                    continue;
                }
                let Some(uid) = UID_RE
                    .captures(&response.text)
                    .and_then(|caps| caps[1].parse::<u32>().ok())
                else {
                    warn!(response = %response.text, "FETCH response without UID, ignoring");
                    continue;
                };
                let raw = response.literals.first().map(Vec::as_slice).unwrap_or_default();
                by_uid.insert(uid, HeaderMessage::from_headers(uid, raw));
            }
        }

        // Keep the order the caller asked for.
        let messages: Vec<HeaderMessage> = uids.iter().filter_map(|uid| by_uid.remove(uid)).collect();
        if messages.len() < uids.len() {
            warn!(
                requested = uids.len(),
                received = messages.len(),
                "Server returned fewer messages than requested"
            );
        }
        Ok(messages)
    }

    fn set_flag(&mut self, uid: u32, flag: Flag, value: bool) -> Result<(), ImapError> {
        let op = if value { '+' } else { '-' };
        self.command(&format!("UID STORE {uid} {op}FLAGS ({})", flag.as_imap()))?;
        Ok(())
    }
}

impl<S: Read + Write> Drop for ImapSession<S> {
    fn drop(&mut self) {
        if let Err(e) = self.logout() {
            debug!("IMAP logout on drop failed: {e}");
        }
    }
}

/// Quote a string argument, escaping backslashes and double quotes.
pub fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Length of a trailing `{n}` literal marker, if the line ends with one.
fn literal_len(line: &str) -> Option<usize> {
    let open = line.strip_suffix('}')?.rfind('{')?;
    line[open + 1..line.len() - 1].parse().ok()
}

/// Command verb for error messages; never includes arguments such as passwords.
fn command_name(command: &str) -> String {
    let mut words = command.split_whitespace();
    match words.next() {
        Some("UID") => format!("UID {}", words.next().unwrap_or_default()),
        Some(verb) => verb.to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::io::Cursor;
    use std::rc::Rc;

    use super::*;

    /// In-memory server: replays a fixed script and records what the client wrote.
    struct ScriptedStream {
        input: Cursor<Vec<u8>>,
        written: Rc<RefCell<Vec<u8>>>,
    }

    impl Read for ScriptedStream {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.input.read(buf)
        }
    }

    impl Write for ScriptedStream {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.written.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn session(script: &str) -> (ImapSession<ScriptedStream>, Rc<RefCell<Vec<u8>>>) {
        let written = Rc::new(RefCell::new(Vec::new()));
        let stream = ScriptedStream {
            input: Cursor::new(format!("* OK IMAP4rev1 ready\r\n{script}").into_bytes()),
            written: Rc::clone(&written),
        };
        (ImapSession::from_stream(stream).unwrap(), written)
    }

    fn sent(written: &Rc<RefCell<Vec<u8>>>) -> String {
        String::from_utf8(written.borrow().clone()).unwrap()
    }

    fn secret(s: &str) -> SecretString {
        SecretString::from(s.to_string())
    }

    #[test]
    fn login_and_select_send_quoted_arguments() {
        let (mut session, written) = session(
            "A1 OK LOGIN completed\r\n\
             * 12 EXISTS\r\n\
             * 0 RECENT\r\n\
             A2 OK [READ-WRITE] SELECT completed\r\n",
        );

        session.login("me@example.com", &secret("pa\"ss")).unwrap();
        let exists = session.select("GitHub").unwrap();

        assert_eq!(exists, 12);
        assert_eq!(
            sent(&written),
            "A1 LOGIN \"me@example.com\" \"pa\\\"ss\"\r\nA2 SELECT \"GitHub\"\r\n"
        );
    }

    #[test]
    fn rejected_login_is_an_error_without_the_password() {
        let (mut session, _) = session("A1 NO [AUTHENTICATIONFAILED] Invalid credentials\r\n");

        let err = session.login("me", &secret("hunter2")).unwrap_err();
        match &err {
            ImapError::Command { command, response } => {
                assert_eq!(command, "LOGIN");
                assert!(response.starts_with("NO"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!err.to_string().contains("hunter2"));
    }

    #[test]
    fn bye_greeting_is_rejected() {
        let stream = ScriptedStream {
            input: Cursor::new(b"* BYE too many connections\r\n".to_vec()),
            written: Rc::default(),
        };
        assert!(matches!(
            ImapSession::from_stream(stream),
            Err(ImapError::Greeting(_))
        ));
    }

    #[test]
    fn search_collects_uids() {
        let (mut session, written) = session("* SEARCH 4 8 15\r\nA1 OK SEARCH completed\r\n");

        let uids = session
            .search(&SearchCriteria::unread_github_notifications())
            .unwrap();

        assert_eq!(uids, vec![4, 8, 15]);
        assert_eq!(
            sent(&written),
            "A1 UID SEARCH UNSEEN FROM \"notifications@github.com\"\r\n"
        );
    }

    #[test]
    fn empty_search_returns_no_uids() {
        let (mut session, _) = session("* SEARCH\r\nA1 OK SEARCH completed\r\n");
        assert!(session.search(&SearchCriteria::default()).unwrap().is_empty());
    }

    #[test]
    fn fetch_reads_header_literals_in_requested_order() {
        let first = "Subject: First\r\nMessage-ID: <a/b/issues/1@github.com>\r\n\r\n";
        let second = "Subject: Second\r\nReferences: <a/b/pull/2@github.com>\r\n\r\n";
        let script = format!(
            "* 2 FETCH (UID 9 BODY[HEADER] {{{}}}\r\n{second})\r\n\
             * 1 FETCH (BODY[HEADER] {{{}}}\r\n{first} UID 5)\r\n\
             * 1 FETCH (FLAGS (\\Recent))\r\n\
             A1 OK FETCH completed\r\n",
            second.len(),
            first.len(),
        );
        let (mut session, written) = session(&script);

        let messages = session.fetch_headers(&[5, 9]).unwrap();

        assert_eq!(sent(&written), "A1 UID FETCH 5,9 (UID BODY.PEEK[HEADER])\r\n");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].uid, 5);
        assert_eq!(messages[0].subject, "First");
        assert_eq!(messages[0].reference_header(), Some("a/b/issues/1@github.com"));
        assert_eq!(messages[1].uid, 9);
        assert_eq!(messages[1].reference_header(), Some("a/b/pull/2@github.com"));
    }

    #[test]
    fn fetch_splits_large_uid_sets() {
        let uids: Vec<u32> = (1..=(FETCH_CHUNK as u32 + 1)).collect();
        let (mut session, written) =
            session("A1 OK FETCH completed\r\nA2 OK FETCH completed\r\n");

        session.fetch_headers(&uids).unwrap();

        let sent = sent(&written);
        let commands: Vec<&str> = sent.lines().collect();
        assert_eq!(commands.len(), 2);
        assert!(commands[0].starts_with("A1 UID FETCH 1,2,3,"));
        assert_eq!(commands[1], format!("A2 UID FETCH {} (UID BODY.PEEK[HEADER])", FETCH_CHUNK + 1));
    }

    #[test]
    fn set_flag_stores_seen() {
        let (mut session, written) = session(
            "* 3 FETCH (UID 42 FLAGS (\\Seen))\r\nA1 OK STORE completed\r\n\
             A2 OK STORE completed\r\n",
        );

        session.set_flag(42, Flag::Seen, true).unwrap();
        session.set_flag(42, Flag::Flagged, false).unwrap();

        assert_eq!(
            sent(&written),
            "A1 UID STORE 42 +FLAGS (\\Seen)\r\nA2 UID STORE 42 -FLAGS (\\Flagged)\r\n"
        );
    }

    #[test]
    fn logout_is_sent_once() {
        let (mut session, written) =
            session("* BYE logging out\r\nA1 OK LOGOUT completed\r\n");

        session.logout().unwrap();
        session.logout().unwrap();
        drop(session);

        assert_eq!(sent(&written), "A1 LOGOUT\r\n");
    }

    #[test]
    fn drop_logs_out() {
        let (session, written) = session("* BYE\r\nA1 OK LOGOUT completed\r\n");
        drop(session);
        assert_eq!(sent(&written), "A1 LOGOUT\r\n");
    }

    #[test]
    fn closed_connection_is_reported() {
        let (mut session, _) = session("");
        assert!(matches!(
            session.search(&SearchCriteria::default()),
            Err(ImapError::ConnectionClosed)
        ));
    }

    #[test]
    fn literal_markers_are_detected() {
        assert_eq!(literal_len("* 1 FETCH (BODY[HEADER] {342}"), Some(342));
        assert_eq!(literal_len("* 1 FETCH (UID 5)"), None);
        assert_eq!(literal_len("{abc}"), None);
    }

    #[test]
    fn command_names_omit_arguments() {
        assert_eq!(command_name("LOGIN \"u\" \"p\""), "LOGIN");
        assert_eq!(command_name("UID FETCH 1:* (FLAGS)"), "UID FETCH");
    }
}
