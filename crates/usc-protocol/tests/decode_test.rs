//! End-to-end decoding tests.
//!
//! Frames are fed one byte at a time, the way a serial reader would.

use std::sync::{Arc, Mutex};

use usc_protocol::{
    checksum, Command, CommandBuilder, CommandConfig, CommandHandler, ErrorKind, ParseError,
    Params, ResponseBuilder, State, Status,
};

/// Feed a whole frame, asserting `Next` for every byte but the last.
fn decode_frame(command: &mut Command, frame: &[u8]) -> Result<Status, ParseError> {
    let (last, body) = frame.split_last().expect("frame is not empty");
    for &b in body {
        assert_eq!(
            command.process(b),
            Ok(Status::Next),
            "byte {:?} of {:?}",
            b as char,
            String::from_utf8_lossy(frame)
        );
    }
    command.process(*last)
}

fn pairs(params: Params<'_>) -> Vec<(String, Option<String>)> {
    params
        .map(|kv| (kv.key().to_string(), kv.value_str().map(str::to_string)))
        .collect()
}

fn pair(key: &str, value: &str) -> (String, Option<String>) {
    (key.to_string(), Some(value.to_string()))
}

#[test]
fn test_begin_module_with_param() {
    let mut command = Command::default();
    assert_eq!(decode_frame(&mut command, b"!1:10/b?t=10$"), Ok(Status::Complete));
    assert_eq!(command.device(), 1);
    assert_eq!(command.component(), 10);
    assert_eq!(command.action(), Some("b"));
    assert_eq!(pairs(command.params()), vec![pair("t", "10")]);
    assert_eq!(command.params().get("t").map(|kv| kv.value_int(0)), Some(10));
}

#[test]
fn test_write_module_with_two_params() {
    let mut command = Command::default();
    assert_eq!(decode_frame(&mut command, b"!1:3/w?0=1&1=2$"), Ok(Status::Complete));
    assert_eq!(command.action(), Some("w"));
    assert_eq!(pairs(command.params()), vec![pair("0", "1"), pair("1", "2")]);
}

#[test]
fn test_sample_commands() {
    let mut command = Command::default();
    for (frame, component, action) in [
        (&b"!1:10/s$"[..], 10, "s"),
        (b"!1:10/e$", 10, "e"),
        (b"!1:3/format$", 3, "format"),
    ] {
        assert_eq!(decode_frame(&mut command, frame), Ok(Status::Complete));
        assert_eq!(command.device(), 1);
        assert_eq!(command.component(), component);
        assert_eq!(command.action(), Some(action));
        assert!(!command.has_checksum());
        assert!(command.params().is_empty());
    }
}

#[test]
fn test_octet_overflow_is_reported_on_separator() {
    let mut command = Command::default();
    for &b in b"!999" {
        assert_eq!(command.process(b), Ok(Status::Next));
    }
    let err = command.process(b'.').expect_err("octet above 255");
    assert_eq!(err.kind(), ErrorKind::Overflow);
}

#[test]
fn test_checksum_roundtrip_and_corruption() {
    let body = b"!0.0.2.3:123";
    let sum = checksum(body);
    let frame = format!("{}|{}$", String::from_utf8_lossy(body), sum);

    let mut command = Command::default();
    assert_eq!(decode_frame(&mut command, frame.as_bytes()), Ok(Status::Complete));
    assert!(command.has_checksum());
    assert_eq!(command.device(), 0x0203);

    // Change the last checksum digit.
    let mut corrupted = frame.into_bytes();
    let digit = corrupted.len() - 2;
    corrupted[digit] = if corrupted[digit] == b'0' { b'1' } else { b'0' };
    let err = decode_frame(&mut command, &corrupted).expect_err("corrupted checksum");
    assert_eq!(err.kind(), ErrorKind::Invalid);
}

#[test]
fn test_rewind_passes_are_identical() {
    let mut command = Command::default();
    decode_frame(&mut command, b"!1:3/w?a=1&flag&b=x\\=y$").expect("valid frame");

    let mut params = command.params();
    let first = pairs(params.clone());
    let _ = params.by_ref().count();
    params.rewind();
    let second: Vec<_> = params
        .by_ref()
        .map(|kv| (kv.key().to_string(), kv.value_str().map(str::to_string)))
        .collect();

    assert_eq!(first, second);
    assert_eq!(
        first,
        vec![pair("a", "1"), ("flag".to_string(), None), pair("b", "x=y")]
    );
    assert_eq!(params.len(), 3);
}

#[test]
fn test_escape_roundtrip() {
    let original = b"a&b$c|d=e\\f\r\n\t\x08end".to_vec();
    let frame = CommandBuilder::new(&[7])
        .action("put")
        .param("data", &original)
        .with_checksum()
        .encode()
        .expect("valid command");

    let mut command = Command::new(CommandConfig::with_address(7));
    assert_eq!(decode_frame(&mut command, &frame), Ok(Status::Complete));
    let kv = command.params().next().expect("one parameter");
    assert_eq!(kv.key(), "data");
    assert_eq!(kv.value(), Some(&original[..]));
}

#[test]
fn test_overflow_recovery() {
    let mut command = Command::new(CommandConfig::default().with_capacity(16));
    let mut result = Ok(Status::Next);
    for &b in b"!1:10/averyveryverylongaction$" {
        result = command.process(b);
        if result.is_err() {
            break;
        }
    }
    assert_eq!(result, Err(ParseError::BufferOverflow { capacity: 16 }));
    assert_eq!(command.state(), State::Error);

    assert_eq!(decode_frame(&mut command, b"!1:10/s$"), Ok(Status::Complete));
    assert_eq!(command.action(), Some("s"));
}

#[test]
fn test_resync_after_garbage() {
    let mut command = Command::default();
    let mut completed = Vec::new();
    for &b in b"!1:2/a\x07junk\r\n!1:2/b$" {
        if let Ok(Status::Complete) = command.process(b) {
            completed.push(command.action().map(str::to_string));
        }
    }
    assert_eq!(completed, vec![Some("b".to_string())]);
}

#[test]
fn test_response_from_builder() {
    let mut response = ResponseBuilder::new();
    response.push_str("ok&t=3$");
    let frame = response.finish();

    let mut command = Command::default();
    assert_eq!(decode_frame(&mut command, &frame), Ok(Status::Complete));
    assert!(command.is_response());
    assert_eq!(command.body(), Some(&b"ok&t=3$"[..]));
}

// ============================================================================
// Handler dispatch
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Command {
        broadcast: bool,
        component: u16,
        action: Option<String>,
        params: Vec<(String, Option<String>)>,
    },
    Error {
        kind: ErrorKind,
        state: State,
    },
}

#[derive(Clone, Default)]
struct Recorder {
    events: Arc<Mutex<Vec<Event>>>,
}

impl Recorder {
    fn take(&self) -> Vec<Event> {
        std::mem::take(&mut *self.events.lock().expect("lock"))
    }
}

impl CommandHandler for Recorder {
    fn on_command(
        &mut self,
        broadcast: bool,
        component: u16,
        action: Option<&str>,
        params: Params<'_>,
    ) {
        self.events.lock().expect("lock").push(Event::Command {
            broadcast,
            component,
            action: action.map(str::to_string),
            params: pairs(params),
        });
    }

    fn on_error(&mut self, error: &ParseError, command: &Command) {
        self.events.lock().expect("lock").push(Event::Error {
            kind: error.kind(),
            state: command.state(),
        });
    }
}

#[test]
fn test_broadcast_reaches_every_address() {
    let recorder = Recorder::default();
    let mut command = Command::with_handler(CommandConfig::with_address(42), recorder.clone());

    assert_eq!(decode_frame(&mut command, b"!0:1/ping$"), Ok(Status::Complete));
    assert_eq!(
        recorder.take(),
        vec![Event::Command {
            broadcast: true,
            component: 1,
            action: Some("ping".to_string()),
            params: vec![],
        }]
    );
}

#[test]
fn test_matching_address_dispatches() {
    let recorder = Recorder::default();
    let mut command = Command::with_handler(CommandConfig::with_address(0x0102), recorder.clone());

    assert_eq!(decode_frame(&mut command, b"!1.2:5/set?v=9$"), Ok(Status::Complete));
    assert_eq!(
        recorder.take(),
        vec![Event::Command {
            broadcast: false,
            component: 5,
            action: Some("set".to_string()),
            params: vec![pair("v", "9")],
        }]
    );
}

#[test]
fn test_other_address_is_silent_but_ok() {
    let recorder = Recorder::default();
    let mut command = Command::with_handler(CommandConfig::with_address(42), recorder.clone());

    assert_eq!(decode_frame(&mut command, b"!7:1/ping$"), Ok(Status::Complete));
    assert!(!command.is_addressed());
    assert!(recorder.take().is_empty());

    // Responses are never dispatched as commands.
    assert_eq!(decode_frame(&mut command, b"@0$"), Ok(Status::Complete));
    assert!(recorder.take().is_empty());
}

#[test]
fn test_error_callback_gets_snapshot() {
    let recorder = Recorder::default();
    let mut command = Command::with_handler(CommandConfig::default(), recorder.clone());

    let err = decode_frame(&mut command, b"!1:2/a?k=\\z$").expect_err("bad escape");
    assert_eq!(err, ParseError::InvalidEscape(b'z'));
    assert_eq!(
        recorder.take(),
        vec![Event::Error {
            kind: ErrorKind::Invalid,
            state: State::Error,
        }]
    );

    // The handler survives the failure.
    assert_eq!(decode_frame(&mut command, b"!1:2/a$"), Ok(Status::Complete));
    assert_eq!(recorder.take().len(), 1);
}

#[test]
fn test_independent_decoders_across_threads() {
    let handles: Vec<_> = (1..=4u8)
        .map(|device| {
            std::thread::spawn(move || {
                let frame = CommandBuilder::new(&[device])
                    .component(u16::from(device))
                    .action("go")
                    .with_checksum()
                    .encode()
                    .expect("valid command");
                let mut command = Command::new(CommandConfig::with_address(u32::from(device)));
                let mut result = Ok(Status::Next);
                for &b in frame.iter() {
                    result = command.process(b);
                }
                (result, command.device(), command.component())
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let device = i as u32 + 1;
        let (result, decoded, component) = handle.join().expect("thread panicked");
        assert_eq!(result, Ok(Status::Complete));
        assert_eq!(decoded, device);
        assert_eq!(component, device as u16);
    }
}
