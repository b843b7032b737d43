use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use gratex_core::{
    AnimationHeader, DEFAULT_REFRESH_HZ, GratexResult, GratingSpec, HEADER_LEN, Modulation,
    PixelFormat, SweepAxis, Waveform,
};
use gratex_display::{
    DisplayDevice, FeedbackLine, MemoryDevice, NullFeedback, Scheduler, Screen, SignalSource,
    Start, signal_channel,
};
use gratex_render::{convert_raw, encode_grating, encode_sweep};
use gratex_session::{
    OrderPolicy, PresentationLog, SessionConfig, export_results, run_on_trigger, run_ordered,
    scan_animations,
};

#[derive(Parser, Debug)]
#[command(name = "gratex", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Synthesize one grating animation file.
    Build(BuildArgs),
    /// Encode a family of animation files by sweeping one parameter axis.
    Sweep(SweepArgs),
    /// Convert a raw RGB888 stream into an animation file.
    Convert(ConvertArgs),
    /// Print an animation file's header.
    Info(InfoArgs),
    /// Play one animation file on the display.
    Play(PlayArgs),
    /// Play every animation in a directory as a session.
    Session(SessionArgs),
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum WaveformArg {
    Sine,
    Square,
}

impl From<WaveformArg> for Waveform {
    fn from(value: WaveformArg) -> Self {
        match value {
            WaveformArg::Sine => Waveform::Sine,
            WaveformArg::Square => Waveform::Square,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Rgb565,
    Rgb888,
}

impl From<FormatArg> for PixelFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Rgb565 => PixelFormat::Rgb565,
            FormatArg::Rgb888 => PixelFormat::Rgb888,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OrderArg {
    Hashed,
    Random,
}

impl From<OrderArg> for OrderPolicy {
    fn from(value: OrderArg) -> Self {
        match value {
            OrderArg::Hashed => OrderPolicy::Hashed,
            OrderArg::Random => OrderPolicy::Random,
        }
    }
}

/// Stimulus description shared by `build` and `sweep`. A `--spec` JSON file
/// replaces the individual flags.
#[derive(Parser, Debug)]
struct StimulusArgs {
    /// Stimulus description as a JSON file.
    #[arg(long)]
    spec: Option<PathBuf>,

    /// Duration in seconds.
    #[arg(long, required_unless_present = "spec")]
    duration: Option<f64>,

    /// Propagation angle in degrees, counter-clockwise from horizontal.
    #[arg(long, required_unless_present = "spec")]
    angle: Option<f64>,

    /// Spatial frequency in cycles per degree.
    #[arg(long = "sf", required_unless_present = "spec")]
    spatial_freq: Option<f64>,

    /// Temporal frequency in cycles per second.
    #[arg(long = "tf", required_unless_present = "spec")]
    temporal_freq: Option<f64>,

    #[arg(long, default_value_t = 1.0)]
    contrast: f64,

    /// Background luminance, 0-255.
    #[arg(long, default_value_t = 127)]
    background: u8,

    #[arg(long, default_value_t = 1280)]
    width: u32,

    #[arg(long, default_value_t = 720)]
    height: u32,

    #[arg(long, value_enum, default_value_t = WaveformArg::Sine)]
    waveform: WaveformArg,

    #[arg(long, value_enum, default_value_t = FormatArg::Rgb565)]
    format: FormatArg,

    /// Circular mask diameter as a percentage of screen width.
    #[arg(long)]
    mask_diameter: Option<f64>,

    /// Mask edge fade width as a percentage of screen width.
    #[arg(long, default_value_t = 0.0)]
    mask_fade: f64,

    /// Gaussian envelope sigma as a percentage of screen width (Gabor).
    #[arg(long, conflicts_with = "mask_diameter")]
    sigma: Option<f64>,

    /// Modulation center, percent from the left edge.
    #[arg(long, default_value_t = 50.0)]
    center_left: f64,

    /// Modulation center, percent from the top edge.
    #[arg(long, default_value_t = 50.0)]
    center_top: f64,
}

impl StimulusArgs {
    fn resolve(&self) -> anyhow::Result<GratingSpec> {
        if let Some(path) = &self.spec {
            let file =
                File::open(path).with_context(|| format!("open spec '{}'", path.display()))?;
            let spec: GratingSpec = serde_json::from_reader(BufReader::new(file))
                .with_context(|| format!("parse spec '{}'", path.display()))?;
            spec.validate()?;
            return Ok(spec);
        }

        let modulation = if let Some(diameter_pct) = self.mask_diameter {
            Modulation::CircularMask {
                diameter_pct,
                center_left_pct: self.center_left,
                center_top_pct: self.center_top,
                fade_pct: self.mask_fade,
            }
        } else if let Some(sigma_pct) = self.sigma {
            Modulation::Gabor {
                sigma_pct,
                center_left_pct: self.center_left,
                center_top_pct: self.center_top,
            }
        } else {
            Modulation::FullField
        };

        let spec = GratingSpec {
            duration_secs: self.duration.context("--duration is required")?,
            angle_deg: self.angle.context("--angle is required")?,
            spatial_freq: self.spatial_freq.context("--sf is required")?,
            temporal_freq: self.temporal_freq.context("--tf is required")?,
            contrast: self.contrast,
            background: self.background,
            resolution: (self.width, self.height),
            waveform: self.waveform.into(),
            modulation,
            pixel_format: self.format.into(),
        };
        spec.validate()?;
        Ok(spec)
    }
}

#[derive(Parser, Debug)]
struct BuildArgs {
    #[command(flatten)]
    stimulus: StimulusArgs,

    /// Output file.
    #[arg(long)]
    out: PathBuf,

    /// Display refresh rate the file is encoded for.
    #[arg(long, default_value_t = DEFAULT_REFRESH_HZ)]
    refresh: f64,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum AxisArg {
    Angle,
    SpatialFreq,
    TemporalFreq,
    Contrast,
}

#[derive(Parser, Debug)]
struct SweepArgs {
    #[command(flatten)]
    stimulus: StimulusArgs,

    /// Output directory, one file per swept value.
    #[arg(long)]
    out_dir: PathBuf,

    /// Which parameter the value list replaces.
    #[arg(long, value_enum)]
    axis: AxisArg,

    /// Comma-separated values for the swept axis.
    #[arg(long, value_delimiter = ',', required = true)]
    values: Vec<f64>,

    #[arg(long, default_value_t = DEFAULT_REFRESH_HZ)]
    refresh: f64,
}

#[derive(Parser, Debug)]
struct ConvertArgs {
    /// Raw RGB888 input stream.
    src: PathBuf,

    /// Output animation file.
    #[arg(long)]
    out: PathBuf,

    /// Number of frames in the raw stream.
    #[arg(long)]
    frames: u32,

    #[arg(long)]
    width: u32,

    #[arg(long)]
    height: u32,

    /// Refresh cycles each source frame is held for.
    #[arg(long, default_value_t = 1)]
    refreshes: u32,

    #[arg(long, value_enum, default_value_t = FormatArg::Rgb565)]
    format: FormatArg,
}

#[derive(Parser, Debug)]
struct InfoArgs {
    path: PathBuf,
}

#[derive(Parser, Debug)]
struct PlayArgs {
    path: PathBuf,

    /// Background luminance painted before and after playback.
    #[arg(long, default_value_t = 127)]
    background: u8,

    /// Gate playback on a rising edge on this trigger channel.
    #[arg(long)]
    trigger: Option<u8>,

    /// Run on an in-memory device instead of the framebuffer.
    #[arg(long)]
    headless: bool,

    /// Nominal refresh rate for the headless device.
    #[arg(long, default_value_t = DEFAULT_REFRESH_HZ)]
    refresh: f64,

    /// Framebuffer device node.
    #[arg(long, default_value = "/dev/fb0")]
    device: PathBuf,

    /// Toggle the feedback GPIO line at each frame boundary.
    #[arg(long)]
    feedback: bool,
}

#[derive(Parser, Debug)]
struct SessionArgs {
    /// Directory whose files form the stimulus set.
    dir: PathBuf,

    #[arg(long, default_value_t = 127)]
    background: u8,

    #[arg(long, value_enum, default_value_t = OrderArg::Hashed)]
    order: OrderArg,

    /// Background hold between presentations, in seconds.
    #[arg(long, default_value_t = 1.0)]
    interval: f64,

    /// Gate every presentation on this trigger channel and cycle until
    /// aborted.
    #[arg(long)]
    trigger: Option<u8>,

    /// Stimulus type written to logs and results.
    #[arg(long, default_value = "grating")]
    stimulus_type: String,

    /// Append one log line per presentation to this file.
    #[arg(long)]
    log: Option<PathBuf>,

    /// Write session results as JSON to this file.
    #[arg(long)]
    results: Option<PathBuf>,

    #[arg(long)]
    headless: bool,

    #[arg(long, default_value_t = DEFAULT_REFRESH_HZ)]
    refresh: f64,

    #[arg(long, default_value = "/dev/fb0")]
    device: PathBuf,

    #[arg(long)]
    feedback: bool,
}

pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Build(args) => cmd_build(args),
        Command::Sweep(args) => cmd_sweep(args),
        Command::Convert(args) => cmd_convert(args),
        Command::Info(args) => cmd_info(args),
        Command::Play(args) => cmd_play(args),
        Command::Session(args) => cmd_session(args),
    }
}

fn cmd_build(args: BuildArgs) -> anyhow::Result<()> {
    let spec = args.stimulus.resolve()?;
    let header = encode_grating(&args.out, &spec, args.refresh)?;
    println!(
        "wrote {} ({} frames, {}x{}, {:?})",
        args.out.display(),
        header.frame_count,
        header.width,
        header.height,
        header.pixel_format
    );
    Ok(())
}

fn cmd_sweep(args: SweepArgs) -> anyhow::Result<()> {
    let base = args.stimulus.resolve()?;
    let axis = match args.axis {
        AxisArg::Angle => SweepAxis::Angles(args.values),
        AxisArg::SpatialFreq => SweepAxis::SpatialFreqs(args.values),
        AxisArg::TemporalFreq => SweepAxis::TemporalFreqs(args.values),
        AxisArg::Contrast => SweepAxis::Contrasts(args.values),
    };
    let written = encode_sweep(&args.out_dir, &base, &axis, args.refresh)?;
    for path in &written {
        println!("wrote {}", path.display());
    }
    println!("{} files in {}", written.len(), args.out_dir.display());
    Ok(())
}

fn cmd_convert(args: ConvertArgs) -> anyhow::Result<()> {
    let header = convert_raw(
        &args.src,
        &args.out,
        args.frames,
        (args.width, args.height),
        args.refreshes,
        args.format.into(),
    )?;
    println!(
        "wrote {} ({} frames, {}x{}, {:?})",
        args.out.display(),
        header.frame_count,
        header.width,
        header.height,
        header.pixel_format
    );
    Ok(())
}

fn cmd_info(args: InfoArgs) -> anyhow::Result<()> {
    let header = read_header(&args.path)?;
    let actual = std::fs::metadata(&args.path)
        .with_context(|| format!("stat '{}'", args.path.display()))?
        .len();
    println!("frames:       {}", header.frame_count);
    println!("resolution:   {}x{}", header.width, header.height);
    println!("pixel format: {:?}", header.pixel_format);
    println!("frame bytes:  {}", header.frame_bytes());
    let expected = HEADER_LEN as u64 + header.data_bytes();
    if actual == expected {
        println!("file bytes:   {actual}");
    } else {
        println!("file bytes:   {actual} (header implies {expected})");
    }
    Ok(())
}

fn cmd_play(args: PlayArgs) -> anyhow::Result<()> {
    let header = read_header(&args.path)?;
    if args.headless {
        let device = MemoryDevice::paced(
            header.width,
            header.height,
            header.pixel_format,
            args.refresh,
        );
        play_one(device, &args)
    } else {
        play_hardware(&args, header)
    }
}

#[cfg(target_os = "linux")]
fn play_hardware(args: &PlayArgs, header: AnimationHeader) -> anyhow::Result<()> {
    let device = gratex_display::FramebufferDevice::open(
        &args.device,
        (header.width, header.height),
        header.pixel_format,
    )?;
    play_one(device, args)
}

#[cfg(not(target_os = "linux"))]
fn play_hardware(_args: &PlayArgs, _header: AnimationHeader) -> anyhow::Result<()> {
    anyhow::bail!("hardware playback needs the Linux framebuffer; rerun with --headless")
}

fn play_one<D: DisplayDevice>(device: D, args: &PlayArgs) -> anyhow::Result<()> {
    let start = match args.trigger {
        Some(channel) => Start::OnTrigger { channel },
        None => Start::Immediate,
    };
    let (source, mut port) = signal_channel();
    spawn_stdin_watcher(source.clone(), args.trigger);
    #[cfg(target_os = "linux")]
    if let Some(channel) = args.trigger {
        if !args.headless {
            crate::gpio::watch_trigger(channel, source.clone())?;
        }
    }
    let mut feedback = make_feedback(args.feedback)?;

    let mut screen = Screen::open(device, args.background)?;
    let sequence = screen.load_sequence(&args.path)?;
    println!(
        "playing {} ({} frames)",
        args.path.display(),
        sequence.frame_count()
    );
    match start {
        Start::OnTrigger { channel } => {
            println!("waiting for trigger on channel {channel}; press Enter to abort")
        }
        Start::Immediate => println!("press Enter to abort"),
    }

    let mut scheduler = Scheduler::new();
    match scheduler.play(&mut screen, &sequence, start, &mut port, &mut feedback)? {
        Some(record) => println!(
            "done: mean inter-frame {:.1} us, stddev {:.1} us",
            record.mean_interframe_us, record.stddev_interframe_us
        ),
        None => println!("aborted"),
    }
    screen.unload(sequence);
    screen.close()?;
    Ok(())
}

fn cmd_session(args: SessionArgs) -> anyhow::Result<()> {
    let paths = scan_animations(&args.dir)?;
    anyhow::ensure!(
        !paths.is_empty(),
        "no animation files in {}",
        args.dir.display()
    );
    let header = read_header(&paths[0])?;
    if args.headless {
        let device = MemoryDevice::paced(
            header.width,
            header.height,
            header.pixel_format,
            args.refresh,
        );
        run_session(device, &args, paths.len())
    } else {
        session_hardware(&args, header, paths.len())
    }
}

#[cfg(target_os = "linux")]
fn session_hardware(args: &SessionArgs, header: AnimationHeader, count: usize) -> anyhow::Result<()> {
    let device = gratex_display::FramebufferDevice::open(
        &args.device,
        (header.width, header.height),
        header.pixel_format,
    )?;
    run_session(device, args, count)
}

#[cfg(not(target_os = "linux"))]
fn session_hardware(_args: &SessionArgs, _header: AnimationHeader, _count: usize) -> anyhow::Result<()> {
    anyhow::bail!("hardware playback needs the Linux framebuffer; rerun with --headless")
}

fn run_session<D: DisplayDevice>(device: D, args: &SessionArgs, count: usize) -> anyhow::Result<()> {
    let config = SessionConfig {
        dir: args.dir.clone(),
        stimulus_type: args.stimulus_type.clone(),
        order: args.order.into(),
        trial_interval: Duration::from_secs_f64(args.interval),
    };
    let (source, mut port) = signal_channel();
    spawn_stdin_watcher(source.clone(), args.trigger);
    #[cfg(target_os = "linux")]
    if let Some(channel) = args.trigger {
        if !args.headless {
            crate::gpio::watch_trigger(channel, source.clone())?;
        }
    }
    let mut feedback = make_feedback(args.feedback)?;
    let mut log = match &args.log {
        Some(path) => Some(PresentationLog::open(path)?),
        None => None,
    };

    let mut screen = Screen::open(device, args.background)?;
    println!("session of {count} stimuli from {}", args.dir.display());
    println!("press Enter to abort");
    let outcome = match args.trigger {
        Some(channel) => run_on_trigger(
            &mut screen,
            &config,
            channel,
            &mut port,
            &mut feedback,
            log.as_mut(),
        )?,
        None => run_ordered(&mut screen, &config, &mut port, &mut feedback, log.as_mut())?,
    };

    println!(
        "{} presentations{}",
        outcome.presentations.len(),
        if outcome.aborted { " (aborted)" } else { "" }
    );
    if let Some(results) = &args.results {
        export_results(results, &outcome.presentations)?;
        println!("results written to {}", results.display());
    }
    screen.close()?;
    Ok(())
}

enum AppFeedback {
    Null(NullFeedback),
    #[cfg(target_os = "linux")]
    Gpio(crate::gpio::SysfsFeedback),
}

impl FeedbackLine for AppFeedback {
    fn set(&mut self, high: bool) -> GratexResult<()> {
        match self {
            AppFeedback::Null(line) => line.set(high),
            #[cfg(target_os = "linux")]
            AppFeedback::Gpio(line) => line.set(high),
        }
    }
}

fn make_feedback(enabled: bool) -> anyhow::Result<AppFeedback> {
    if !enabled {
        return Ok(AppFeedback::Null(NullFeedback));
    }
    #[cfg(target_os = "linux")]
    {
        let line = crate::gpio::SysfsFeedback::open(u32::from(gratex_core::FEEDBACK_CHANNEL))?;
        return Ok(AppFeedback::Gpio(line));
    }
    #[cfg(not(target_os = "linux"))]
    anyhow::bail!("the feedback line needs Linux sysfs GPIO")
}

/// Operator input: a bare Enter aborts, a line starting with `t` injects a
/// trigger edge on the armed channel (useful headless).
fn spawn_stdin_watcher(source: SignalSource, trigger: Option<u8>) {
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if let Some(channel) = trigger {
                if line.trim_start().starts_with('t') {
                    source.edge(channel);
                    continue;
                }
            }
            source.abort();
        }
    });
}

fn read_header(path: &Path) -> anyhow::Result<AnimationHeader> {
    let mut file = File::open(path).with_context(|| format!("open '{}'", path.display()))?;
    let mut head = [0u8; HEADER_LEN];
    file.read_exact(&mut head)
        .with_context(|| format!("read header of '{}'", path.display()))?;
    AnimationHeader::decode(&head)
        .with_context(|| format!("'{}' is not an animation file", path.display()))
}
