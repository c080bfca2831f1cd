use crate::config::ExportConfig;
use crate::error::CommandError;
use crate::export::export_view;
use crate::render::MarkerIcon;
use crate::tiles::Basemap;
use crate::view::MapView;
use anyhow::Result;
use std::str::FromStr;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::error;

const HELP: &str = "\
commands:
  click LAT LON     select the region under a point
  hover LAT LON     move the pointer
  leave             move the pointer off the map
  clear             clear the selection
  status            show selection, viewport and popup
  regions           list regions with their fill color
  cities            list city markers
  popup CITY        open a city popup
  close             close the open popup
  zoom Z            set the zoom level
  center LAT LON    recenter the map
  pan DX DY         pan by screen pixels
  export            write the current view as PDF
  quit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Click { lat: f64, lon: f64 },
    Hover { lat: f64, lon: f64 },
    Leave,
    Clear,
    Status,
    Regions,
    Cities,
    Popup(String),
    Close,
    Zoom(u8),
    Center { lat: f64, lon: f64 },
    Pan { dx: f64, dy: f64 },
    Export,
    Help,
    Quit,
}

fn number<T: FromStr>(s: &str) -> Result<T, CommandError> {
    s.parse().map_err(|_| CommandError::Number(s.to_string()))
}

fn pair(
    args: &[&str],
    command: &'static str,
    expected: &'static str,
) -> Result<(f64, f64), CommandError> {
    match args {
        [a, b] => Ok((number(a)?, number(b)?)),
        _ => Err(CommandError::Usage { command, expected }),
    }
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let head = words.next().ok_or(CommandError::Empty)?;
        let args: Vec<&str> = words.collect();

        let bare = |cmd: Command, name: &'static str| {
            if args.is_empty() {
                Ok(cmd)
            } else {
                Err(CommandError::Usage { command: name, expected: "no arguments" })
            }
        };

        match head.to_lowercase().as_str() {
            "click" => pair(&args, "click", "LAT LON").map(|(lat, lon)| Command::Click { lat, lon }),
            "hover" => pair(&args, "hover", "LAT LON").map(|(lat, lon)| Command::Hover { lat, lon }),
            "center" => pair(&args, "center", "LAT LON").map(|(lat, lon)| Command::Center { lat, lon }),
            "pan" => pair(&args, "pan", "DX DY").map(|(dx, dy)| Command::Pan { dx, dy }),
            "zoom" => match args.as_slice() {
                [z] => Ok(Command::Zoom(number(z)?)),
                _ => Err(CommandError::Usage { command: "zoom", expected: "Z" }),
            },
            "popup" if !args.is_empty() => Ok(Command::Popup(args.join(" "))),
            "popup" => Err(CommandError::Usage { command: "popup", expected: "CITY" }),
            "leave" => bare(Command::Leave, "leave"),
            "clear" => bare(Command::Clear, "clear"),
            "status" => bare(Command::Status, "status"),
            "regions" => bare(Command::Regions, "regions"),
            "cities" => bare(Command::Cities, "cities"),
            "close" => bare(Command::Close, "close"),
            "export" => bare(Command::Export, "export"),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

pub struct Session {
    view: MapView,
    basemap: Basemap,
    icon: MarkerIcon,
    export: ExportConfig,
}

impl Session {
    pub fn new(view: MapView, basemap: Basemap, icon: MarkerIcon, export: ExportConfig) -> Self {
        Self { view, basemap, icon, export }
    }

    #[cfg(test)]
    pub fn view(&self) -> &MapView {
        &self.view
    }

    /// Apply one command and return the text to show. `None` ends the session.
    pub async fn apply(&mut self, command: Command) -> Option<String> {
        let out = match command {
            Command::Click { lat, lon } => {
                if self.view.click_at(lat, lon) {
                    format!("selection: {}", self.view.selection().label())
                } else {
                    "no region here".to_string()
                }
            }
            Command::Hover { lat, lon } => match self.view.pointer_at(lat, lon) {
                Some(name) => name.to_string(),
                None => String::new(),
            },
            Command::Leave => {
                self.view.pointer_leave();
                String::new()
            }
            Command::Clear => {
                self.view.clear_selection();
                format!("selection: {}", self.view.selection().label())
            }
            Command::Status => self.status(),
            Command::Regions => self.regions(),
            Command::Cities => self
                .view
                .markers()
                .iter()
                .map(|c| format!("• {}", c.name))
                .collect::<Vec<_>>()
                .join("\n"),
            Command::Popup(name) => match self.view.open_popup(&name) {
                Some(city) => city.popup_text(),
                None => format!("no city named '{}'", name),
            },
            Command::Close => {
                self.view.close_popup();
                String::new()
            }
            Command::Zoom(z) => {
                self.view.set_zoom(z);
                format!("zoom {}", self.view.viewport().zoom)
            }
            Command::Center { lat, lon } => {
                self.view.set_center(lat, lon);
                String::new()
            }
            Command::Pan { dx, dy } => {
                self.view.pan_by(dx, dy);
                String::new()
            }
            Command::Export => {
                match export_view(
                    &self.view,
                    &self.basemap,
                    &self.icon,
                    self.export.pixel_ratio,
                    &self.export.output_dir,
                    &self.export.file_prefix,
                )
                .await
                {
                    Ok(path) => format!("saved {}", path.display()),
                    Err(e) => {
                        error!("Export failed: {}", e);
                        String::new()
                    }
                }
            }
            Command::Help => HELP.to_string(),
            Command::Quit => return None,
        };
        Some(out)
    }

    fn status(&self) -> String {
        let vp = self.view.viewport();
        let (north, west) = vp.from_screen(0.0, 0.0);
        let (south, east) = vp.from_screen(vp.width as f64, vp.height as f64);
        let mut lines = vec![
            format!("selection: {}", self.view.selection().label()),
            format!("center: {:.4}, {:.4}  zoom: {}", vp.center_lat, vp.center_lon, vp.zoom),
            format!("visible: {:.4},{:.4} .. {:.4},{:.4}", south, west, north, east),
        ];
        if let Some(name) = self.view.hovered().and_then(|l| l.name()) {
            lines.push(format!("hover: {}", name));
        }
        if let Some(city) = self.view.popup() {
            lines.push(format!("popup: {}", city.popup_text().replace('\n', " ")));
        }
        if !self.view.has_overlay() {
            lines.push("regions: not loaded".to_string());
        }
        lines.join("\n")
    }

    fn regions(&self) -> String {
        self.view
            .layers()
            .iter()
            .map(|l| format!("{:<28} {}", l.name().unwrap_or("(unnamed)"), l.style.fill_color))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Read commands from stdin until `quit` or end of input.
    pub async fn run(mut self) -> Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        println!("{}", self.status());

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let command = match line.parse::<Command>() {
                Ok(c) => c,
                Err(e) => {
                    println!("{}", e);
                    continue;
                }
            };
            match self.apply(command).await {
                Some(out) if !out.is_empty() => println!("{}", out),
                Some(_) => {}
                None => break,
            }
        }
        Ok(())
    }
}
