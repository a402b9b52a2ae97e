//! Supervised process output fed through the stream demultiplexer.
//!
//! The child plays the part of a container engine: it writes a framed
//! stream to stdout, which is captured and then split back into channels.

#![cfg(unix)]

use devrig_integration_tests::wire;
use devrig_process::{run, ProcessOptions, Stdin};
use devrig_stream::{
    demux_copy, DemuxLimits, Demuxed, StreamDemultiplexer, StreamError, StreamType,
};

#[tokio::test]
async fn test_printf_frames_demultiplex() {
    // Two frames, byte for byte: stdout "hello", stderr "oops".
    let script = r"printf '\001\000\000\000\000\000\000\005hello\002\000\000\000\000\000\000\004oops'";
    let result = run("/bin/sh", ["-c", script], ProcessOptions::default()).await;
    assert!(result.success(), "{}", result.outcome);

    let captured = result.stdout.expect("stdout captured");
    let frames = StreamDemultiplexer::demultiplex(
        &captured,
        DemuxLimits::default().with_expected_total(captured.len() as u64),
    )
    .unwrap();
    let demuxed = Demuxed::from_frames(&frames).unwrap();
    assert_eq!(demuxed.stdout, b"hello");
    assert_eq!(demuxed.stderr, b"oops");
}

#[tokio::test]
async fn test_echoed_stream_in_small_chunks() {
    let mut frames = Vec::new();
    for i in 0..200u32 {
        let stream = if i % 3 == 0 {
            StreamType::Stderr
        } else {
            StreamType::Stdout
        };
        frames.push((stream, format!("line {i}\n").into_bytes()));
    }
    let refs: Vec<(StreamType, &[u8])> = frames.iter().map(|(t, p)| (*t, p.as_slice())).collect();
    let input = wire(&refs);

    let options = ProcessOptions::default().with_stdin(Stdin::Bytes(input.clone()));
    let result = run("cat", Vec::<&str>::new(), options).await;
    assert!(result.success(), "{}", result.outcome);
    let echoed = result.stdout.expect("stdout captured");
    assert_eq!(echoed, input);

    let mut demux = StreamDemultiplexer::new();
    let mut out = Vec::new();
    for chunk in echoed.chunks(7) {
        out.extend(demux.push(chunk).unwrap());
    }
    demux.finish().unwrap();

    assert_eq!(out.len(), 200);
    for (frame, (stream, payload)) in out.iter().zip(&frames) {
        assert_eq!(frame.stream_type, *stream);
        assert_eq!(&frame.payload[..], payload.as_slice());
    }
}

#[tokio::test]
async fn test_truncated_capture_is_reported() {
    let input = wire(&[(StreamType::Stdout, &[b'x'; 64])]);
    let options = ProcessOptions::default()
        .with_stdin(Stdin::Bytes(input))
        .with_max_output_bytes(40);
    let result = run("cat", Vec::<&str>::new(), options).await;
    assert!(result.stdout_truncated);

    let captured = result.stdout.expect("stdout captured");
    let mut demux = StreamDemultiplexer::new();
    assert!(demux.push(&captured).unwrap().is_empty());
    assert!(matches!(
        demux.finish(),
        Err(StreamError::UnexpectedEof { buffered: 40 })
    ));
}

#[tokio::test]
async fn test_copy_captured_output() {
    let input = wire(&[
        (StreamType::Stdout, b"built image\n"),
        (StreamType::Stderr, b"warning: cache miss\n"),
    ]);
    let options = ProcessOptions::default().with_stdin(Stdin::Bytes(input));
    let result = run("cat", Vec::<&str>::new(), options).await;
    let captured = result.stdout.expect("stdout captured");

    let mut out = Vec::new();
    let mut err = Vec::new();
    let stats = demux_copy(&captured[..], &mut out, &mut err, DemuxLimits::default())
        .await
        .unwrap();
    assert_eq!(stats.frames, 2);
    assert_eq!(out, b"built image\n");
    assert_eq!(err, b"warning: cache miss\n");
}
