//! # Engine Modes
//!
//! The engine is always in exactly one [`EngineMode`]. The mode decides which worker
//! threads may exist and which subsystems are valid, and it only changes through
//! [`ModeController::transition`].
//!
//! ## Key Components
//! - `EngineMode`: the nine engine states
//! - `Effect`: one side effect a transition performs on the engine subsystems
//! - `Edge`: how a (from, to) pair is handled, looked up with [`edge`]
//! - `ModeEffects`: implemented by whatever owns the subsystems; executes effects
//! - `ModeController`: holds the current mode and walks edges
//!
//! Multi-step requests such as leaving a level straight to `Exit` are expressed as a
//! route of intermediate modes. Each hop is itself a table edge, so the teardown of every
//! intermediate mode runs in order.

use log::info;

use crate::error::EngineError;

/// The state of the engine as a whole.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EngineMode {
    /// Headless AI-game menu. Initial mode.
    AiMenu,
    /// Graphical main menu.
    GraphicalMenu,
    /// Loading an editable level.
    InitLevel,
    /// Playing an editable level.
    EditLevel,
    /// Tearing an editable level down.
    ExitLevel,
    /// Loading a recorded game for playback.
    InitRecord,
    /// Playing a recorded game back.
    PlayingRecord,
    /// Tearing a playback down.
    ExitRecord,
    /// Terminal.
    Exit,
}

impl EngineMode {
    /// Every mode.
    pub const ALL: [EngineMode; 9] = [
        EngineMode::AiMenu,
        EngineMode::GraphicalMenu,
        EngineMode::InitLevel,
        EngineMode::EditLevel,
        EngineMode::ExitLevel,
        EngineMode::InitRecord,
        EngineMode::PlayingRecord,
        EngineMode::ExitRecord,
        EngineMode::Exit,
    ];

    /// Whether frames are being rendered for a running level or playback.
    pub fn is_in_game(self) -> bool {
        matches!(self, EngineMode::EditLevel | EngineMode::PlayingRecord)
    }

    /// Whether this mode belongs to record playback.
    pub fn is_record(self) -> bool {
        matches!(
            self,
            EngineMode::InitRecord | EngineMode::PlayingRecord | EngineMode::ExitRecord
        )
    }

    /// Whether AI mode may be toggled while in this mode.
    pub fn allows_ai_toggle(self) -> bool {
        !matches!(self, EngineMode::EditLevel | EngineMode::PlayingRecord)
    }
}

/// A side effect of a transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Turn AI mode on or off.
    SetAiMode(bool),
    /// Open the window and graphics context.
    InitGraphics,
    /// Close the window and graphics context.
    ReleaseGraphics,
    /// Set every worker's "should run" flag.
    MarkWorkersRunnable,
    /// Stop and join every worker (terrain, input, tick).
    StopWorkers,
    /// Drop all level data and level GUI elements.
    ReleaseLevel,
    /// Forget the selected terrain source.
    ClearTerrainSource,
    /// Stop everything that is still running.
    Shutdown,
}

/// How a requested transition is carried out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Edge {
    /// Requested mode is the current one. Nothing happens.
    Stay,
    /// Apply the effects, then enter the requested mode.
    Step(&'static [Effect]),
    /// Walk `through` hop by hop, then apply `then` and enter the requested mode.
    Via {
        through: &'static [EngineMode],
        then: &'static [Effect],
    },
}

const ENTER_GRAPHICAL_MENU: &[Effect] = &[Effect::SetAiMode(false), Effect::InitGraphics];
const ENTER_RECORD: &[Effect] = &[
    Effect::SetAiMode(false),
    Effect::InitGraphics,
    Effect::MarkWorkersRunnable,
];
const LEAVE_GRAPHICS: &[Effect] = &[
    Effect::ReleaseGraphics,
    Effect::SetAiMode(true),
    Effect::ClearTerrainSource,
];
const LEAVE_LEVEL_TO_AI_MENU: &[Effect] = &[
    Effect::ReleaseLevel,
    Effect::ReleaseGraphics,
    Effect::SetAiMode(true),
    Effect::ClearTerrainSource,
];
const RELOAD_LEVEL: &[Effect] = &[Effect::ReleaseLevel, Effect::MarkWorkersRunnable];
const SHUTDOWN: &[Effect] = &[Effect::Shutdown];

/// Looks up how to go from `from` to `to`.
///
/// # Returns
/// `None` if the pair is not a valid transition
pub fn edge(from: EngineMode, to: EngineMode) -> Option<Edge> {
    use EngineMode::*;

    if from == to {
        return Some(Edge::Stay);
    }

    let edge = match (from, to) {
        (AiMenu, GraphicalMenu) => Edge::Step(ENTER_GRAPHICAL_MENU),
        (AiMenu, InitRecord) => Edge::Step(ENTER_RECORD),
        (AiMenu, Exit) => Edge::Step(SHUTDOWN),

        (GraphicalMenu, InitLevel) => Edge::Step(&[Effect::MarkWorkersRunnable]),
        (GraphicalMenu, AiMenu) => Edge::Step(LEAVE_GRAPHICS),
        (GraphicalMenu, Exit) => Edge::Via {
            through: &[AiMenu],
            then: SHUTDOWN,
        },

        (InitLevel, EditLevel) | (InitRecord, PlayingRecord) => Edge::Step(&[]),

        (InitLevel | EditLevel | InitRecord | PlayingRecord, ExitLevel) => {
            Edge::Step(&[Effect::StopWorkers])
        }
        (InitRecord | PlayingRecord, ExitRecord) => Edge::Step(&[Effect::StopWorkers]),

        (EditLevel, InitLevel) => Edge::Via {
            through: &[ExitLevel],
            then: RELOAD_LEVEL,
        },
        (InitLevel | EditLevel, Exit) => Edge::Via {
            through: &[ExitLevel, GraphicalMenu, AiMenu],
            then: SHUTDOWN,
        },

        (ExitLevel, GraphicalMenu) => Edge::Step(&[Effect::ReleaseLevel]),
        (ExitLevel, AiMenu) => Edge::Step(LEAVE_LEVEL_TO_AI_MENU),
        (ExitLevel, Exit) => Edge::Via {
            through: &[GraphicalMenu, AiMenu],
            then: SHUTDOWN,
        },

        (InitRecord | PlayingRecord, AiMenu) => Edge::Via {
            through: &[ExitRecord],
            then: LEAVE_LEVEL_TO_AI_MENU,
        },
        (InitRecord | PlayingRecord, Exit) => Edge::Via {
            through: &[ExitRecord, AiMenu],
            then: SHUTDOWN,
        },

        (ExitRecord, AiMenu) => Edge::Step(LEAVE_LEVEL_TO_AI_MENU),
        (ExitRecord, Exit) => Edge::Via {
            through: &[AiMenu],
            then: SHUTDOWN,
        },

        _ => return None,
    };

    Some(edge)
}

/// Executes transition side effects against the engine subsystems.
pub trait ModeEffects {
    /// Applies one effect of the transition `from` → `to`.
    fn apply(&mut self, effect: Effect, from: EngineMode, to: EngineMode)
        -> Result<(), EngineError>;

    /// Called after the controller has entered `mode`.
    fn entered(&mut self, _mode: EngineMode) {}
}

/// Owner of the current engine mode.
#[derive(Debug)]
pub struct ModeController {
    mode: EngineMode,
}

impl Default for ModeController {
    fn default() -> Self {
        Self::new()
    }
}

impl ModeController {
    /// Creates a controller in [`EngineMode::AiMenu`].
    pub fn new() -> Self {
        Self::starting_at(EngineMode::AiMenu)
    }

    /// Creates a controller already in `mode`.
    pub fn starting_at(mode: EngineMode) -> Self {
        Self { mode }
    }

    /// The current mode.
    pub fn mode(&self) -> EngineMode {
        self.mode
    }

    /// Moves to `to`, running every side effect on the way.
    ///
    /// If an effect fails, the controller stays in the last mode it fully entered.
    ///
    /// # Arguments
    /// * `to` - The requested mode
    /// * `effects` - Receiver of the side effects
    ///
    /// # Returns
    /// `InvalidTransition` if the pair is not in the table, or the first effect error
    pub fn transition<E: ModeEffects + ?Sized>(
        &mut self,
        to: EngineMode,
        effects: &mut E,
    ) -> Result<(), EngineError> {
        let from = self.mode;
        let edge = edge(from, to).ok_or(EngineError::InvalidTransition { from, to })?;

        match edge {
            Edge::Stay => return Ok(()),
            Edge::Step(list) => {
                for effect in list {
                    effects.apply(*effect, from, to)?;
                }
            }
            Edge::Via { through, then } => {
                for hop in through {
                    self.transition(*hop, effects)?;
                }
                let last = self.mode;
                for effect in then {
                    effects.apply(*effect, last, to)?;
                }
            }
        }

        info!("Engine mode {:?} -> {:?}", self.mode, to);
        self.mode = to;
        effects.entered(to);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        effects: Vec<Effect>,
    }

    impl ModeEffects for Recorder {
        fn apply(
            &mut self,
            effect: Effect,
            _from: EngineMode,
            _to: EngineMode,
        ) -> Result<(), EngineError> {
            self.effects.push(effect);
            Ok(())
        }
    }

    #[test]
    fn test_every_route_hop_is_a_valid_edge() {
        for from in EngineMode::ALL {
            for to in EngineMode::ALL {
                if let Some(Edge::Via { through, .. }) = edge(from, to) {
                    let mut current = from;
                    for hop in through {
                        assert!(
                            matches!(edge(current, *hop), Some(Edge::Step(_))),
                            "{:?} -> {:?} routes through invalid hop {:?}",
                            from,
                            to,
                            hop
                        );
                        current = *hop;
                    }
                }
            }
        }
    }

    #[test]
    fn test_exit_is_terminal() {
        for to in EngineMode::ALL {
            let expected = to == EngineMode::Exit;
            assert_eq!(edge(EngineMode::Exit, to).is_some(), expected);
        }
    }

    #[test]
    fn test_failed_effect_keeps_last_entered_mode() {
        struct FailOnRelease;
        impl ModeEffects for FailOnRelease {
            fn apply(
                &mut self,
                effect: Effect,
                _from: EngineMode,
                _to: EngineMode,
            ) -> Result<(), EngineError> {
                match effect {
                    Effect::ReleaseGraphics => Err(EngineError::GraphicsUnavailable),
                    _ => Ok(()),
                }
            }
        }

        let mut controller = ModeController::starting_at(EngineMode::EditLevel);
        let result = controller.transition(EngineMode::Exit, &mut FailOnRelease);
        assert!(result.is_err());
        assert_eq!(controller.mode(), EngineMode::GraphicalMenu);
    }

    #[test]
    fn test_record_exit_unwinds_through_exit_record() {
        let mut controller = ModeController::starting_at(EngineMode::PlayingRecord);
        let mut recorder = Recorder::default();
        controller
            .transition(EngineMode::AiMenu, &mut recorder)
            .unwrap();
        assert_eq!(
            recorder.effects,
            vec![
                Effect::StopWorkers,
                Effect::ReleaseLevel,
                Effect::ReleaseGraphics,
                Effect::SetAiMode(true),
                Effect::ClearTerrainSource,
            ]
        );
    }
}
