//! Workflow fixtures shared by the integration suites.

use std::sync::{Arc, Mutex};

use renderloom::context::{ContextError, RenderContext};
use renderloom::sink::Sink;
use renderloom::workflow::Workflow;

use super::workers::{CounterWorker, FailingWorker, Ticker};

// ---------------------------------------------------------------------------
// Greeter: the smallest complete workflow (toggle between two greetings)
// ---------------------------------------------------------------------------

pub struct Greeter;

pub enum GreeterAction {
    Toggle,
}

pub struct GreeterScreen {
    pub greeting: String,
    pub toggle: Sink<GreeterAction>,
}

impl Workflow for Greeter {
    type State = String;
    type Action = GreeterAction;
    type Output = ();
    type Rendering = GreeterScreen;

    fn initial_state(&self) -> String {
        "Hello".to_string()
    }

    fn render(
        &self,
        state: &String,
        ctx: &RenderContext<Self>,
    ) -> Result<GreeterScreen, ContextError> {
        Ok(GreeterScreen {
            greeting: state.clone(),
            toggle: ctx.make_sink()?,
        })
    }

    fn update(&self, state: &mut String, action: GreeterAction) -> Option<()> {
        match action {
            GreeterAction::Toggle => {
                *state = if state == "Hello" { "Goodbye" } else { "Hello" }.to_string();
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Echo: leaf child with observable state; emits "{tag}#{count}" on request
// ---------------------------------------------------------------------------

pub struct Echo {
    pub tag: &'static str,
}

pub enum EchoAction {
    Bump,
    Emit,
}

#[derive(Debug)]
pub struct EchoScreen {
    pub count: u64,
    pub poke: Sink<EchoAction>,
}

impl Workflow for Echo {
    type State = u64;
    type Action = EchoAction;
    type Output = String;
    type Rendering = EchoScreen;

    fn initial_state(&self) -> u64 {
        0
    }

    fn render(&self, state: &u64, ctx: &RenderContext<Self>) -> Result<EchoScreen, ContextError> {
        Ok(EchoScreen {
            count: *state,
            poke: ctx.make_sink()?,
        })
    }

    fn update(&self, state: &mut u64, action: EchoAction) -> Option<String> {
        match action {
            EchoAction::Bump => {
                *state += 1;
                None
            }
            EchoAction::Emit => Some(format!("{}#{}", self.tag, state)),
        }
    }
}

// ---------------------------------------------------------------------------
// KeyedPair: two Echo children under "left"/"right" with distinct output
// maps; `duplicate` collapses both onto "left" to provoke DuplicateChildKey
// ---------------------------------------------------------------------------

pub struct KeyedPair {
    pub duplicate: bool,
}

pub enum PairAction {
    LeftDone(String),
    RightDone(String),
}

#[derive(Debug)]
pub struct PairScreen {
    pub left: EchoScreen,
    pub right: EchoScreen,
    pub seen: Vec<String>,
}

impl Workflow for KeyedPair {
    type State = Vec<String>;
    type Action = PairAction;
    type Output = ();
    type Rendering = PairScreen;

    fn initial_state(&self) -> Vec<String> {
        Vec::new()
    }

    fn render(
        &self,
        state: &Vec<String>,
        ctx: &RenderContext<Self>,
    ) -> Result<PairScreen, ContextError> {
        let left = ctx.render_child(Echo { tag: "A" }, "left", PairAction::LeftDone)?;
        let second_key = if self.duplicate { "left" } else { "right" };
        let right = ctx.render_child(Echo { tag: "B" }, second_key, PairAction::RightDone)?;
        Ok(PairScreen {
            left,
            right,
            seen: state.clone(),
        })
    }

    fn update(&self, state: &mut Vec<String>, action: PairAction) -> Option<()> {
        match action {
            PairAction::LeftDone(msg) => state.push(format!("left:{msg}")),
            PairAction::RightDone(msg) => state.push(format!("right:{msg}")),
        }
        None
    }
}

// ---------------------------------------------------------------------------
// Gate/Pulse: conditional child for teardown tests; the child optionally
// runs an infinite Ticker whose ticks flow upward as outputs
// ---------------------------------------------------------------------------

pub struct Pulse {
    pub job: Option<&'static str>,
}

pub enum PulseAction {
    Poke,
    Tick(u64),
}

pub struct PulseScreen {
    pub count: u64,
    pub poke: Sink<PulseAction>,
}

impl Workflow for Pulse {
    type State = u64;
    type Action = PulseAction;
    type Output = u64;
    type Rendering = PulseScreen;

    fn initial_state(&self) -> u64 {
        0
    }

    fn render(&self, state: &u64, ctx: &RenderContext<Self>) -> Result<PulseScreen, ContextError> {
        if let Some(job) = self.job {
            ctx.await_result(Ticker { job, period_ms: 5 }, |event| match event {
                Ok(n) => PulseAction::Tick(n),
                Err(_) => PulseAction::Tick(0),
            })?;
        }
        Ok(PulseScreen {
            count: *state,
            poke: ctx.make_sink()?,
        })
    }

    fn update(&self, state: &mut u64, action: PulseAction) -> Option<u64> {
        match action {
            PulseAction::Poke => {
                *state += 1;
                None
            }
            PulseAction::Tick(n) => Some(n),
        }
    }
}

pub struct Gate {
    pub open: bool,
    pub job: Option<&'static str>,
}

pub enum GateAction {
    ChildTick(u64),
    Ping,
}

pub struct GateScreen {
    pub pulse: Option<PulseScreen>,
    pub seen: Vec<u64>,
    pub ping: Sink<GateAction>,
}

impl Workflow for Gate {
    type State = Vec<u64>;
    type Action = GateAction;
    type Output = ();
    type Rendering = GateScreen;

    fn initial_state(&self) -> Vec<u64> {
        Vec::new()
    }

    fn render(
        &self,
        state: &Vec<u64>,
        ctx: &RenderContext<Self>,
    ) -> Result<GateScreen, ContextError> {
        let pulse = if self.open {
            Some(ctx.render_child(Pulse { job: self.job }, "inner", GateAction::ChildTick)?)
        } else {
            None
        };
        Ok(GateScreen {
            pulse,
            seen: state.clone(),
            ping: ctx.make_sink()?,
        })
    }

    fn update(&self, state: &mut Vec<u64>, action: GateAction) -> Option<()> {
        match action {
            GateAction::ChildTick(n) => state.push(n),
            GateAction::Ping => {}
        }
        None
    }
}

// ---------------------------------------------------------------------------
// Stasher: smuggles its RenderContext out of the pass to prove revocation
// ---------------------------------------------------------------------------

pub struct Stasher {
    pub stash: Arc<Mutex<Option<RenderContext<Stasher>>>>,
}

pub enum StasherAction {
    Noop,
}

impl Workflow for Stasher {
    type State = ();
    type Action = StasherAction;
    type Output = ();
    type Rendering = ();

    fn initial_state(&self) {}

    fn render(&self, _state: &(), ctx: &RenderContext<Self>) -> Result<(), ContextError> {
        *self.stash.lock().unwrap() = Some(ctx.clone());
        Ok(())
    }

    fn update(&self, _state: &mut (), _action: StasherAction) -> Option<()> {
        None
    }
}

// ---------------------------------------------------------------------------
// Listener / FragileListener: record worker deliveries and failures
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct ListenerLog {
    pub ticks: Vec<u64>,
    pub error: Option<String>,
}

pub enum ListenerAction {
    Tick(u64),
    Failed(String),
}

pub struct Listener {
    pub job: &'static str,
    pub limit: u64,
}

impl Workflow for Listener {
    type State = ListenerLog;
    type Action = ListenerAction;
    type Output = ();
    type Rendering = ListenerLog;

    fn initial_state(&self) -> ListenerLog {
        ListenerLog::default()
    }

    fn render(
        &self,
        state: &ListenerLog,
        ctx: &RenderContext<Self>,
    ) -> Result<ListenerLog, ContextError> {
        ctx.await_result(
            CounterWorker {
                job: self.job,
                limit: self.limit,
            },
            |event| match event {
                Ok((_, n)) => ListenerAction::Tick(n),
                Err(err) => ListenerAction::Failed(err.message().to_string()),
            },
        )?;
        Ok(state.clone())
    }

    fn update(&self, state: &mut ListenerLog, action: ListenerAction) -> Option<()> {
        match action {
            ListenerAction::Tick(n) => state.ticks.push(n),
            ListenerAction::Failed(msg) => state.error = Some(msg),
        }
        None
    }
}

pub struct FragileListener {
    pub job: &'static str,
}

impl Workflow for FragileListener {
    type State = ListenerLog;
    type Action = ListenerAction;
    type Output = ();
    type Rendering = ListenerLog;

    fn initial_state(&self) -> ListenerLog {
        ListenerLog::default()
    }

    fn render(
        &self,
        state: &ListenerLog,
        ctx: &RenderContext<Self>,
    ) -> Result<ListenerLog, ContextError> {
        ctx.await_result(FailingWorker { job: self.job }, |event| match event {
            Ok(n) => ListenerAction::Tick(n),
            Err(err) => ListenerAction::Failed(err.message().to_string()),
        })?;
        Ok(state.clone())
    }

    fn update(&self, state: &mut ListenerLog, action: ListenerAction) -> Option<()> {
        match action {
            ListenerAction::Tick(n) => state.ticks.push(n),
            ListenerAction::Failed(msg) => state.error = Some(msg),
        }
        None
    }
}

// ---------------------------------------------------------------------------
// JobSwitcher: the declared worker follows state, so a Switch action makes
// the next pass declare logically different work (forcing a restart)
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct SwitchLog {
    pub job: &'static str,
    pub ticks: Vec<(&'static str, u64)>,
}

pub enum SwitchAction {
    Tick(&'static str, u64),
    Switch,
}

pub struct SwitcherScreen {
    pub ticks: Vec<(&'static str, u64)>,
    pub switch: Sink<SwitchAction>,
}

pub struct JobSwitcher {
    pub limit: u64,
}

impl Workflow for JobSwitcher {
    type State = SwitchLog;
    type Action = SwitchAction;
    type Output = ();
    type Rendering = SwitcherScreen;

    fn initial_state(&self) -> SwitchLog {
        SwitchLog {
            job: "first",
            ticks: Vec::new(),
        }
    }

    fn render(
        &self,
        state: &SwitchLog,
        ctx: &RenderContext<Self>,
    ) -> Result<SwitcherScreen, ContextError> {
        ctx.await_result(
            CounterWorker {
                job: state.job,
                limit: self.limit,
            },
            |event| match event {
                Ok((job, n)) => SwitchAction::Tick(job, n),
                Err(_) => SwitchAction::Tick("error", 0),
            },
        )?;
        Ok(SwitcherScreen {
            ticks: state.ticks.clone(),
            switch: ctx.make_sink()?,
        })
    }

    fn update(&self, state: &mut SwitchLog, action: SwitchAction) -> Option<()> {
        match action {
            SwitchAction::Tick(job, n) => state.ticks.push((job, n)),
            SwitchAction::Switch => state.job = "second",
        }
        None
    }
}

// ---------------------------------------------------------------------------
// FeedReader: push-based source via subscribe()
// ---------------------------------------------------------------------------

pub struct FeedReader {
    pub feed: Vec<u64>,
}

pub enum FeedAction {
    Item(u64),
}

impl Workflow for FeedReader {
    type State = Vec<u64>;
    type Action = FeedAction;
    type Output = ();
    type Rendering = Vec<u64>;

    fn initial_state(&self) -> Vec<u64> {
        Vec::new()
    }

    fn render(
        &self,
        state: &Vec<u64>,
        ctx: &RenderContext<Self>,
    ) -> Result<Vec<u64>, ContextError> {
        ctx.subscribe(
            "feed",
            futures_util::stream::iter(self.feed.clone()),
            FeedAction::Item,
        )?;
        Ok(state.clone())
    }

    fn update(&self, state: &mut Vec<u64>, action: FeedAction) -> Option<()> {
        match action {
            FeedAction::Item(n) => state.push(n),
        }
        None
    }
}
