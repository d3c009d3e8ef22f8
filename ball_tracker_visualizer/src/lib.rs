use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use ball_tracker::{FrameResult, ResultSink};
use image::{ExtendedColorType, ImageEncoder};
use tokio::sync::broadcast;

const JPEG_QUALITY: u8 = 75;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameFormat {
    Jpeg,
}

#[derive(Debug, Clone)]
pub struct FramePacket {
    pub ts_millis: u64,
    pub width: u32,
    pub height: u32,
    pub format: FrameFormat,
    pub data: Arc<[u8]>,
}

/// Scoreboard message sent to browsers, one per analyzed frame.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "web", derive(serde::Serialize, serde::Deserialize))]
pub struct Meta {
    pub ts_millis: u64,
    pub position: Option<(f32, f32)>,
    pub trail: Vec<(f32, f32)>,
    pub speed: f32,
    pub score_a: u32,
    pub score_b: u32,
    /// "A" or "B" on the frame that ended a rally.
    pub point_awarded: Option<String>,
}

impl From<&FrameResult> for Meta {
    fn from(result: &FrameResult) -> Self {
        let pair = |p: &ball_tracker::Point| (p.x as f32, p.y as f32);
        Self {
            ts_millis: result.timestamp.as_millis() as u64,
            position: result.position.as_ref().map(pair),
            trail: result.trail.iter().map(pair).collect(),
            speed: result.speed as f32,
            score_a: result.score_a,
            score_b: result.score_b,
            point_awarded: result.point_awarded.map(|side| format!("{side:?}")),
        }
    }
}

#[derive(Clone)]
pub struct FrameBus {
    pub frames_tx: broadcast::Sender<FramePacket>,
    pub meta_tx: broadcast::Sender<Meta>,
}

impl FrameBus {
    pub fn new(capacity: usize) -> Self {
        let (frames_tx, _) = broadcast::channel::<FramePacket>(capacity.max(1));
        let (meta_tx, _) = broadcast::channel::<Meta>(capacity.max(1));
        Self { frames_tx, meta_tx }
    }
}

/// Publishes every pipeline result onto the bus as `Meta`.
/// Sending never waits; with no subscribers the message is discarded.
pub struct BusSink {
    bus: FrameBus,
}

impl BusSink {
    pub fn new(bus: FrameBus) -> Self {
        Self { bus }
    }
}

impl ResultSink for BusSink {
    fn notify(&self, result: &FrameResult) {
        if self.bus.meta_tx.receiver_count() == 0 {
            return;
        }
        let _ = self.bus.meta_tx.send(Meta::from(result));
    }
}

/// Encodes a packed RGB8 frame as a JPEG packet.
pub fn encode_jpeg(
    width: u32,
    height: u32,
    rgb: &[u8],
    timestamp: Duration,
) -> Result<FramePacket> {
    let expected = width as usize * height as usize * 3;
    if rgb.len() != expected {
        bail!(
            "rgb buffer holds {} bytes, {width}x{height} needs {expected}",
            rgb.len()
        );
    }
    let mut data = Vec::new();
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut data, JPEG_QUALITY);
    encoder.write_image(rgb, width, height, ExtendedColorType::Rgb8)?;
    Ok(FramePacket {
        ts_millis: timestamp.as_millis() as u64,
        width,
        height,
        format: FrameFormat::Jpeg,
        data: data.into(),
    })
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
}

#[derive(Clone)]
pub struct ControlHandle {
    pub play_tx: tokio::sync::watch::Sender<bool>,
}

/// Browser client: overlay frames on a canvas, scoreboard above it.
#[cfg(feature = "web")]
const INDEX_HTML: &str = r#"<!doctype html>
<html>
<head><title>Ball Tracker</title></head>
<body style="font-family:sans-serif; background:#111; color:#eee">
  <h2>Ball Tracker</h2>
  <div style="margin: 8px 0; display:flex; gap:12px; align-items:center;">
    <button id="btn-play" style="padding:6px 12px;">Play</button>
    <button id="btn-pause" style="padding:6px 12px;">Pause</button>
    <span id="score" style="font-family:monospace; font-size:20px">A 0 - 0 B</span>
    <span id="speed" style="font-family:monospace; color:#aaa">0 px/s</span>
    <span id="status" style="font-family:monospace; font-size:12px; color:#777">idle</span>
  </div>
  <canvas id="preview" width="1280" height="720" style="border:1px solid #444"></canvas>
  <script>
  (function(){
    const status = (t)=>{ document.getElementById('status').textContent = t; };
    const control = (action, label)=> ()=>
      fetch('/control/' + action, { method:'POST' }).then(()=>status(label));
    document.getElementById('btn-play').onclick = control('play', 'playing');
    document.getElementById('btn-pause').onclick = control('pause', 'paused');
    const base = (location.protocol==='https:'?'wss://':'ws://') + location.host;
    const canvas = document.getElementById('preview');
    const ctx = canvas.getContext('2d');
    const frames = new WebSocket(base + '/ws/frames');
    frames.binaryType = 'arraybuffer';
    frames.onopen = ()=> status('connected');
    frames.onclose = ()=> status('disconnected');
    // Frame size of the last bitmap, to map image coordinates onto the canvas.
    let source = { w: canvas.width, h: canvas.height };
    let last = null;
    const drawOverlay = ()=>{
      if (!last) { return; }
      const sx = canvas.width / source.w, sy = canvas.height / source.h;
      ctx.strokeStyle = '#e6ff3c';
      ctx.fillStyle = '#e6ff3c';
      ctx.lineWidth = 3;
      ctx.beginPath();
      last.trail.forEach((p, i)=>{
        const x = p[0] * sx, y = p[1] * sy;
        if (i === 0) { ctx.moveTo(x, y); } else { ctx.lineTo(x, y); }
      });
      ctx.stroke();
      if (last.position) {
        ctx.beginPath();
        ctx.arc(last.position[0] * sx, last.position[1] * sy, 8, 0, 2 * Math.PI);
        ctx.fill();
      }
    };
    frames.onmessage = async (ev)=>{
      const bmp = await createImageBitmap(new Blob([ev.data], {type:'image/jpeg'}));
      source = { w: bmp.width, h: bmp.height };
      ctx.drawImage(bmp, 0, 0, canvas.width, canvas.height);
      drawOverlay();
    };
    const meta = new WebSocket(base + '/ws/meta');
    meta.onmessage = (ev)=>{
      const m = JSON.parse(ev.data);
      last = m;
      document.getElementById('score').textContent = 'A ' + m.score_a + ' - ' + m.score_b + ' B';
      document.getElementById('speed').textContent = Math.round(m.speed) + ' px/s';
      if (m.point_awarded) { status('point ' + m.point_awarded); }
    };
  })();
  </script>
</body>
</html>"#;

#[cfg(feature = "web")]
pub async fn start_server(
    bus: FrameBus,
    cfg: ServerConfig,
    control: ControlHandle,
) -> Result<tokio::task::JoinHandle<()>> {
    use anyhow::Context;
    use axum::Router;
    use axum::extract::State;
    use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
    use axum::http::StatusCode;
    use axum::response::{Html, IntoResponse};
    use axum::routing::{get, post};
    use tokio::sync::broadcast::error::RecvError;
    use tracing::{debug, error, info};

    #[derive(Clone)]
    struct AppState {
        bus: FrameBus,
        control: ControlHandle,
    }

    async fn index() -> Html<&'static str> {
        Html(INDEX_HTML)
    }

    async fn play(State(state): State<AppState>) -> StatusCode {
        state.control.play_tx.send_replace(true);
        StatusCode::NO_CONTENT
    }

    async fn pause(State(state): State<AppState>) -> StatusCode {
        state.control.play_tx.send_replace(false);
        StatusCode::NO_CONTENT
    }

    async fn frames_ws(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
        let rx = state.bus.frames_tx.subscribe();
        ws.on_upgrade(move |socket| forward_frames(socket, rx))
    }

    async fn meta_ws(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
        let rx = state.bus.meta_tx.subscribe();
        ws.on_upgrade(move |socket| forward_meta(socket, rx))
    }

    async fn forward_frames(mut socket: WebSocket, mut rx: broadcast::Receiver<FramePacket>) {
        loop {
            match rx.recv().await {
                Ok(pkt) => {
                    if socket.send(Message::Binary(pkt.data.to_vec())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "frame subscriber lagging");
                    continue;
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    async fn forward_meta(mut socket: WebSocket, mut rx: broadcast::Receiver<Meta>) {
        loop {
            match rx.recv().await {
                Ok(meta) => {
                    let Ok(text) = serde_json::to_string(&meta) else {
                        continue;
                    };
                    if socket.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    }

    let app = Router::new()
        .route("/", get(index))
        .route("/ws/frames", get(frames_ws))
        .route("/ws/meta", get(meta_ws))
        .route("/control/play", post(play))
        .route("/control/pause", post(pause))
        .with_state(AppState { bus, control });

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr)
        .await
        .with_context(|| format!("binding visualizer to {}", cfg.bind_addr))?;
    info!(addr = %cfg.bind_addr, "visualizer listening");

    Ok(tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("visualizer server stopped: {e}");
        }
    }))
}
