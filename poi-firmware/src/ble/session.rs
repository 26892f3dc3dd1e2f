//! Per-connection write handling
//!
//! Every RX write goes through [`LinkSession::on_write`], which routes it,
//! acts on it, and tells the connection loop whether to accept the write and
//! what to publish. Nothing here waits: upload chunks are queued with
//! `try_send`, so a slow flash write turns into a rejected write instead of
//! a stalled radio.

use defmt::*;

use poi_core::config::PoiConfig;
use poi_core::control::{apply_setting, SettingOutcome};
use poi_core::ingress::{link_lost, route, IngressState, Route};
use poi_core::render::pacing::clamp_rate;
use poi_core::ring::{PushOutcome, STREAM_RING_FRAMES};
use poi_core::state::ModeEvent;
use poi_core::upload::{queue_chunk, QueueOutcome};
use poi_protocol::command::StreamStart;
use poi_protocol::frame::PROTOCOL_VERSION;
use poi_protocol::{
    Command, ConfigReply, FrameReassembler, Reply, StreamDataFrames, UploadChunk, UploadClassifier,
    BYTES_PER_PIXEL,
};

use crate::channels::{
    self, SETTINGS_DIRTY, SHARED, SHUFFLE_RESTART, STREAM_RING, UPLOAD_ABORT, UPLOAD_QUEUE,
};

/// What the connection loop does with a write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
pub enum WriteOutcome {
    /// Accept the write and publish the reply, if any
    Accept(Option<Reply>),
    /// Refuse the write; the peer should retry it
    Reject,
}

/// Ingress state of one BLE connection
pub struct LinkSession {
    config: &'static PoiConfig,
    reassembler: FrameReassembler,
    classifier: UploadClassifier,
}

impl LinkSession {
    pub fn new(config: &'static PoiConfig) -> Self {
        let mut reassembler = FrameReassembler::new();
        reassembler.set_verify_checksum(config.stream.verify_checksum);
        Self {
            config,
            reassembler,
            classifier: UploadClassifier::new(),
        }
    }

    /// Track the negotiated ATT MTU for upload chunk sizing
    pub fn set_mtu(&mut self, att_mtu: u16) {
        self.classifier.set_mtu(att_mtu);
    }

    /// Handle one RX write at uptime `now_ms`
    pub fn on_write(&mut self, data: &[u8], now_ms: u32) -> WriteOutcome {
        let state = IngressState {
            upload_active: SHARED.upload_active(),
            reassembling: !self.reassembler.is_idle(),
            mode: SHARED.mode(),
        };

        match route(data, state) {
            Route::UploadChunk => match self.classifier.continuation(data) {
                Ok(chunk) => self.queue_chunk(chunk),
                Err(e) => {
                    warn!("Bad upload chunk: {:?}", e);
                    WriteOutcome::Accept(None)
                }
            },
            Route::Reassemble => {
                self.reassemble(data, now_ms);
                WriteOutcome::Accept(None)
            }
            Route::Command => self.on_command(data, now_ms),
            Route::Drop => {
                debug!("Dropped {} byte write", data.len());
                WriteOutcome::Accept(None)
            }
        }
    }

    fn on_command(&mut self, data: &[u8], now_ms: u32) -> WriteOutcome {
        let command = match Command::parse(data) {
            Ok(command) => command,
            Err(e) => {
                warn!("Command rejected: {:?}", e);
                return WriteOutcome::Accept(Some(Reply::Error));
            }
        };

        let reply = match command {
            Command::SetPattern(_) => {
                return match self.classifier.first_chunk(data) {
                    Ok(chunk) => self.queue_chunk(chunk),
                    Err(e) => {
                        warn!("Bad upload start: {:?}", e);
                        WriteOutcome::Accept(Some(Reply::Error))
                    }
                };
            }
            Command::StartStream(StreamStart::Frames(body)) => {
                self.enter_streaming(now_ms);
                self.reassembler.reset();
                self.reassemble(body, now_ms);
                None
            }
            Command::StartStream(start) => {
                let requested = match start {
                    StreamStart::Rate(hz) => hz,
                    _ => self.config.stream.default_rate_hz,
                };
                let rate = clamp_rate(requested, self.config.stream.max_rate_hz);
                SHARED.set_stream_rate(rate);
                self.enter_streaming(now_ms);
                info!("Streaming at {}Hz", rate);
                Some(Reply::Success)
            }
            Command::StopStream => {
                let (from, to) = SHARED.apply(ModeEvent::StopStream);
                self.reassembler.reset();
                STREAM_RING.lock(|ring| ring.borrow_mut().clear());
                info!("Stream stopped: {:?} -> {:?}", from, to);
                Some(Reply::Success)
            }
            Command::StreamData(body) => Some(self.stream_data(body, now_ms)),
            Command::GetFwVersion => Some(Reply::FirmwareVersion),
            Command::GetConfig => Some(Reply::Config(ConfigReply {
                pixel_count: self.config.strip.pixels,
                protocol_version: PROTOCOL_VERSION,
                buffer_capacity: STREAM_RING_FRAMES as u16,
                hw_limit: self.config.stream.max_rate_hz,
                battery_mv: channels::battery_mv(),
                free_kb: Some(channels::free_kb()),
            })),
            Command::SetSpeed | Command::Ignored(_) => Some(Reply::Success),
            _ => Some(self.on_setting(&command)),
        };
        WriteOutcome::Accept(reply)
    }

    fn on_setting(&self, command: &Command<'_>) -> Reply {
        match channels::update_settings(|settings| apply_setting(command, settings)) {
            SettingOutcome::Updated {
                reload,
                restart_shuffle,
            } => {
                if reload {
                    SHARED.request_reload();
                }
                if restart_shuffle {
                    SHUFFLE_RESTART.signal(());
                }
                SETTINGS_DIRTY.signal(());
                Reply::Success
            }
            SettingOutcome::Rejected(e) => {
                warn!("Setting rejected: {:?}", e);
                Reply::Error
            }
            SettingOutcome::NotASetting => Reply::Error,
        }
    }

    fn enter_streaming(&self, now_ms: u32) {
        let (from, to) = SHARED.apply(ModeEvent::StartStream);
        if from != to {
            info!("Mode {:?} -> {:?}", from, to);
        }
        // Fresh watchdog window so the first frame has time to arrive
        SHARED.note_frame(now_ms);
    }

    fn stream_data(&self, body: &[u8], now_ms: u32) -> Reply {
        let frame_len = usize::from(self.config.strip.pixels) * BYTES_PER_PIXEL;
        let frames = match StreamDataFrames::new(body, frame_len) {
            Ok(frames) => frames,
            Err(e) => {
                warn!("Stream data rejected: {:?}", e);
                return Reply::Error;
            }
        };
        if frames.remainder() > 0 {
            debug!("Ignoring {} trailing stream bytes", frames.remainder());
        }

        self.enter_streaming(now_ms);
        STREAM_RING.lock(|ring| {
            let mut ring = ring.borrow_mut();
            for frame in frames {
                match ring.push(frame, None) {
                    Ok(outcome) => log_push(outcome),
                    Err(e) => warn!("Ring push failed: {:?}", e),
                }
            }
        });
        SHARED.note_frame(now_ms);
        Reply::Success
    }

    fn reassemble(&mut self, fragment: &[u8], now_ms: u32) {
        let mut received = false;
        for frame in self.reassembler.feed(fragment) {
            let pushed =
                STREAM_RING.lock(|ring| ring.borrow_mut().push(&frame.payload, Some(frame.seq)));
            match pushed {
                Ok(outcome) => log_push(outcome),
                Err(e) => warn!("Ring push failed for seq {}: {:?}", frame.seq, e),
            }
            received = true;
        }
        if received {
            SHARED.note_frame(now_ms);
        }
    }

    fn queue_chunk(&mut self, chunk: UploadChunk) -> WriteOutcome {
        let slot = channels::settings().pattern_slot();
        match queue_chunk(&SHARED, &UPLOAD_QUEUE, chunk, slot) {
            QueueOutcome::Queued { started: Some(generation) } => {
                info!("Upload {} started", generation);
                WriteOutcome::Accept(None)
            }
            QueueOutcome::Queued { started: None } => WriteOutcome::Accept(None),
            QueueOutcome::Full => {
                warn!("Upload queue full, rejecting chunk");
                WriteOutcome::Reject
            }
        }
    }

    /// Connection closed: drop partial state and leave streaming
    pub fn reset(&mut self) {
        debug!("Reassembler stats: {:?}", self.reassembler.stats());
        let teardown = link_lost(&SHARED, &STREAM_RING, &mut self.reassembler);
        if let Some(generation) = teardown.aborted_upload {
            warn!("Link lost during upload {}, discarding", generation);
            UPLOAD_ABORT.signal(generation);
        }
        if teardown.frames_dropped > 0 {
            debug!("Dropped {} buffered stream frames", teardown.frames_dropped);
        }
        if teardown.from != teardown.to {
            info!("Mode {:?} -> {:?}", teardown.from, teardown.to);
        }
    }
}

fn log_push(outcome: PushOutcome) {
    match outcome {
        PushOutcome::Overwrote(dropped) => debug!("Ring full, dropped {} frames", dropped),
        PushOutcome::Duplicate => trace!("Duplicate frame dropped"),
        PushOutcome::Stored => {}
    }
}
