//! Browser collaborators: 2D canvas renderer and keyboard input

use std::cell::RefCell;
use std::f64::consts::TAU;
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, KeyboardEvent};

use super::{Action, InputState, RenderItem, RenderSink};
use crate::error::RenderError;
use crate::sim::{Rect, Shape};

/// Circles smaller than this (shots) get no facing marker
const NOSE_MIN_RADIUS: f32 = 6.0;

fn js_error(e: JsValue) -> RenderError {
    RenderError(format!("{e:?}"))
}

/// Draws every item as a flat shape, scaled from playfield to canvas pixels
pub struct CanvasRenderer {
    ctx: CanvasRenderingContext2d,
    width: f64,
    height: f64,
    scale: f64,
}

impl CanvasRenderer {
    pub fn new(canvas: &HtmlCanvasElement, field: Rect) -> Result<Self, RenderError> {
        let ctx = canvas
            .get_context("2d")
            .map_err(js_error)?
            .ok_or_else(|| RenderError("2d context unavailable".into()))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| RenderError("not a 2d context".into()))?;
        let width = f64::from(canvas.width());
        let height = f64::from(canvas.height());
        let scale = (width / f64::from(field.width)).min(height / f64::from(field.height));
        Ok(Self {
            ctx,
            width,
            height,
            scale,
        })
    }
}

fn sprite_color(sprite: &str, frame: u32) -> &'static str {
    match sprite {
        "player" if frame == 1 => "rgba(120, 220, 255, 0.35)",
        "player" => "#78dcff",
        "player_shot" => "#fff48a",
        "enemy_shot" => "#ff6b6b",
        "drone" => "#c792ea",
        "weaver" => "#82aaff",
        "orbiter" => "#f78c6c",
        "lancer" => "#ffcb6b",
        "spinner" => "#c3e88d",
        _ => "#eeeeee",
    }
}

impl RenderSink for CanvasRenderer {
    fn begin(&mut self) -> Result<(), RenderError> {
        self.ctx.set_fill_style_str("#0b0d17");
        self.ctx.fill_rect(0.0, 0.0, self.width, self.height);
        Ok(())
    }

    fn draw(&mut self, item: &RenderItem<'_>) -> Result<(), RenderError> {
        let s = self.scale;
        let x = f64::from(item.pos.x) * s;
        let y = f64::from(item.pos.y) * s;
        self.ctx.set_fill_style_str(sprite_color(item.sprite, item.frame));
        match item.shape {
            Shape::Circle { radius } => {
                self.ctx.begin_path();
                self.ctx
                    .arc(x, y, f64::from(radius) * s, 0.0, TAU)
                    .map_err(js_error)?;
                self.ctx.fill();
                if radius >= NOSE_MIN_RADIUS {
                    let nose = crate::heading(item.heading) * radius * 0.7;
                    self.ctx.set_fill_style_str("#ffffff");
                    self.ctx.begin_path();
                    self.ctx
                        .arc(
                            x + f64::from(nose.x) * s,
                            y + f64::from(nose.y) * s,
                            f64::from(radius * 0.25) * s,
                            0.0,
                            TAU,
                        )
                        .map_err(js_error)?;
                    self.ctx.fill();
                }
            }
            Shape::Rect { width, height } => {
                let (w, h) = (f64::from(width) * s, f64::from(height) * s);
                self.ctx.fill_rect(x - w / 2.0, y - h / 2.0, w, h);
            }
        }
        Ok(())
    }
}

/// Keep `input` in sync with the window's key events
pub fn bind_keyboard(input: Rc<RefCell<InputState>>) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;

    for (kind, pressed) in [("keydown", true), ("keyup", false)] {
        let input = input.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
            if let Some(action) = Action::from_key(&event.key()) {
                event.prevent_default();
                input.borrow_mut().set(action, pressed);
            }
        });
        window.add_event_listener_with_callback(kind, closure.as_ref().unchecked_ref())?;
        closure.forget();
    }

    // Nothing stays held once the window loses focus
    let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
        input.borrow_mut().clear();
    });
    window.add_event_listener_with_callback("blur", closure.as_ref().unchecked_ref())?;
    closure.forget();
    Ok(())
}
