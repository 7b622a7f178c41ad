use crate::text::TextPainter;
use rsvp_core::View;
use rsvp_experiment::TrialConfig;
use tiny_skia::{Color, Pixmap};

const BLACK: [u8; 4] = [20, 20, 20, 255];
const GRAY: [u8; 4] = [110, 110, 110, 255];
const BLUE: [u8; 4] = [25, 118, 210, 255];
const GREEN: [u8; 4] = [46, 125, 50, 255];
const RED: [u8; 4] = [198, 40, 40, 255];

struct Line {
    text: String,
    px: f32,
    color: [u8; 4],
}

fn line(text: impl Into<String>, px: f32, color: [u8; 4]) -> Line {
    Line {
        text: text.into(),
        px,
        color,
    }
}

fn spacer(px: f32) -> Line {
    line("", px, BLACK)
}

/// Paint the current view (or nothing, during the blank stage) onto the
/// frame canvas.
pub fn draw(canvas: &mut Pixmap, painter: &TextPainter, cfg: &TrialConfig, view: Option<&View>) {
    canvas.fill(Color::from_rgba8(250, 250, 250, 255));
    let lines = compose(cfg, view);
    draw_block(canvas, painter, &lines);
}

/// Fatal host-side problem (e.g. a trial that refused to start).
pub fn draw_error(canvas: &mut Pixmap, painter: &TextPainter, message: &str) {
    canvas.fill(Color::from_rgba8(250, 250, 250, 255));
    let lines = [
        line("Experiment error", 28.0, RED),
        spacer(10.0),
        line(message, 18.0, BLACK),
        spacer(10.0),
        line("[Esc] Quit", 17.0, GRAY),
    ];
    draw_block(canvas, painter, &lines);
}

fn compose(cfg: &TrialConfig, view: Option<&View>) -> Vec<Line> {
    let t = &cfg.texts;
    let Some(view) = view else {
        return Vec::new();
    };
    match view {
        View::Instructions {
            start_enabled,
            fullscreen_notice,
        } => {
            let mut lines = vec![line(&t.instruction_title, 34.0, BLACK), spacer(14.0)];
            for text in &t.instruction_lines {
                lines.push(line(text, 19.0, BLACK));
            }
            lines.push(spacer(14.0));
            lines.push(line(&t.fullscreen_instruction, 17.0, BLUE));
            lines.push(spacer(8.0));
            if *start_enabled {
                lines.push(line(format!("[Enter] {}", t.start_button), 20.0, GREEN));
            } else {
                lines.push(line(format!("[F] {}", t.fullscreen_button), 20.0, BLUE));
            }
            if *fullscreen_notice {
                lines.push(spacer(8.0));
                lines.push(line(&t.start_needs_fullscreen, 17.0, RED));
            }
            lines
        }
        View::FullscreenPrompt => vec![
            line(&t.fullscreen_instruction, 19.0, BLUE),
            spacer(12.0),
            line(format!("[F] {}", t.fullscreen_button), 20.0, BLUE),
        ],
        View::ReadyConfirmation => vec![
            line(&t.confirm_ready, 24.0, BLACK),
            spacer(12.0),
            line(format!("[Enter] {}", t.confirm_ready_button), 20.0, GREEN),
        ],
        View::Ready => vec![line(&t.ready, 28.0, BLACK)],
        View::Fixation => vec![line(&cfg.fixation_symbol, 40.0, BLACK)],
        View::Word(word) => vec![line(word, 30.0, BLACK)],
        View::Mask => vec![line(&cfg.mask_symbol, 40.0, BLACK)],
        View::DigitSet(digits) => vec![line(digits, 40.0, BLACK)],
        View::PercentSigns => vec![line(&cfg.percent_symbol, 40.0, BLACK)],
        View::SpelledDigit(spelled) => vec![line(spelled, 40.0, BLACK)],
        View::DigitQuestion { spelled, answered } => {
            let mut lines = vec![line(t.digit_question_for(spelled), 24.0, BLACK), spacer(16.0)];
            match answered {
                None => lines.push(line(
                    format!("[Y] {}      [N] {}", t.yes_button, t.no_button),
                    22.0,
                    BLUE,
                )),
                Some(answer) => lines.push(line(
                    format!("Recorded: {}", answer.as_str()),
                    20.0,
                    GRAY,
                )),
            }
            lines
        }
        View::FreeRecall {
            remaining_secs,
            draft,
            show_empty_error,
        } => {
            let mut lines = vec![
                line(&t.recall_title, 26.0, BLACK),
                line(&t.recall_prompt, 19.0, BLACK),
                line(t.time_remaining_for(*remaining_secs), 17.0, BLUE),
                spacer(12.0),
                line(format!("> {draft}_"), 20.0, BLACK),
                spacer(12.0),
            ];
            if *show_empty_error {
                lines.push(line(&t.empty_recall_error, 17.0, RED));
            }
            lines.push(line(format!("[Enter] {}", t.submit_button), 17.0, GRAY));
            lines
        }
        View::RecallTimedOut { .. } => vec![
            line(&t.timeout_notice, 22.0, RED),
            spacer(12.0),
            line(format!("[Enter] {}", t.continue_button), 20.0, GREEN),
        ],
        View::Paused => vec![
            line(&t.paused_title, 28.0, BLACK),
            spacer(10.0),
            line(&t.fullscreen_exited, 18.0, BLACK),
            spacer(12.0),
            line(format!("[F] {}", t.return_to_fullscreen), 20.0, GREEN),
        ],
        View::End(summary) => {
            let verdict = if summary.answer_correct() {
                ("Correct", GREEN)
            } else {
                ("Incorrect", RED)
            };
            vec![
                line(&t.end_title, 28.0, GREEN),
                spacer(12.0),
                line(
                    format!(
                        "Digits: {}   Spelled: {}   Present: {}",
                        summary.digits,
                        summary.spelled,
                        if summary.present { "Yes" } else { "No" }
                    ),
                    17.0,
                    GRAY,
                ),
                line(
                    format!("Digit response: {} ({})", summary.answer.as_str(), verdict.0),
                    18.0,
                    verdict.1,
                ),
                spacer(10.0),
                line("Your recall:", 16.0, GRAY),
                line(&summary.recall, 18.0, BLACK),
                spacer(6.0),
                line("Original:", 16.0, GRAY),
                line(&summary.sentence, 18.0, BLACK),
            ]
        }
    }
}

fn draw_block(canvas: &mut Pixmap, painter: &TextPainter, lines: &[Line]) {
    let total: f32 = lines.iter().map(|l| painter.line_height(l.px)).sum();
    let center_x = canvas.width() as f32 / 2.0;
    let mut y = (canvas.height() as f32 - total) / 2.0;
    for l in lines {
        let height = painter.line_height(l.px);
        if !l.text.is_empty() {
            painter.draw_centered(canvas, &l.text, l.px, center_x, y + height * 0.8, l.color);
        }
        y += height;
    }
}
