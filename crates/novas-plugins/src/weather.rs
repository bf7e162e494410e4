use novas_parts::prelude::*;
use serde_json::Value;

use crate::common::{StateLabels, expect_tool, labelled, scalar_field, str_field, tool_card, tool_error};

const LABELS: StateLabels = StateLabels {
    streaming: "Getting weather...",
    input_available: "Location received",
    output_available: "Weather data ready",
    output_error: "Weather unavailable",
    other: "Ready",
};

const FORECAST_DAYS: usize = 3;

/// `tool-weather` / `tool-get_weather`.
pub struct WeatherPlugin;

impl PartPlugin for WeatherPlugin {
    fn plugin_type(&self) -> &str {
        "tool-weather"
    }

    fn display_name(&self) -> &str {
        "Weather"
    }

    fn description(&self) -> &str {
        "Renders weather tool calls with current conditions and a short forecast"
    }

    fn can_handle(&self, part_type: &str) -> bool {
        matches!(part_type, "tool-weather" | "tool-get_weather")
    }

    fn render(&self, ctx: &RenderContext<'_>) -> Result<RenderOutcome, PluginError> {
        let tool = expect_tool(ctx, self.plugin_type())?;
        let mut details = Vec::new();
        if let Some(location) = tool.input.as_ref().and_then(|i| str_field(i, &["location"])) {
            details.push(labelled("Location", location));
        }
        match tool.state {
            ToolState::OutputAvailable => details.push(render_weather(tool.output.as_ref())),
            ToolState::OutputError => details.push(tool_error(tool)),
            _ => {}
        }
        Ok(RenderOutcome::show(tool_card("Weather", tool, &LABELS, details)))
    }
}

/// Coarse icon name for a condition description.
pub fn condition_icon(condition: &str) -> &'static str {
    let lower = condition.to_lowercase();
    if lower.contains("rain") || lower.contains("shower") {
        "rain"
    } else if lower.contains("sun") || lower.contains("clear") {
        "sun"
    } else {
        "cloud"
    }
}

fn render_weather(output: Option<&Value>) -> RenderNode {
    let Some(weather) = output.filter(|o| o.is_object()) else {
        return RenderNode::placeholder("No weather data available");
    };
    let condition = str_field(weather, &["condition", "description"]);
    let mut children = vec![RenderNode::row(vec![
        RenderNode::muted(format!("[{}]", condition_icon(condition.unwrap_or_default()))),
        RenderNode::strong(str_field(weather, &["location", "city"]).unwrap_or("Unknown Location")),
        RenderNode::text(condition.unwrap_or("No description")),
    ])];

    if let Some(temperature) = scalar_field(weather, &["temperature"]) {
        let mut row = vec![RenderNode::strong(format!("{temperature}°"))];
        if let Some(feels_like) = scalar_field(weather, &["feels_like"]) {
            row.push(RenderNode::muted(format!("Feels like {feels_like}°")));
        }
        children.push(RenderNode::row(row));
    }
    if let Some(humidity) = scalar_field(weather, &["humidity"]) {
        children.push(labelled("Humidity", format!("{humidity}%")));
    }
    if let Some(wind) = scalar_field(weather, &["wind_speed"]) {
        children.push(labelled("Wind", format!("{wind} km/h")));
    }
    let high = scalar_field(weather, &["high"]);
    let low = scalar_field(weather, &["low"]);
    if high.is_some() || low.is_some() {
        children.push(labelled(
            "High / Low",
            format!("{}° / {}°", high.unwrap_or_default(), low.unwrap_or_default()),
        ));
    }

    if let Some(forecast) = weather.get("forecast").and_then(Value::as_array) {
        let rows = forecast
            .iter()
            .take(FORECAST_DAYS)
            .enumerate()
            .map(|(i, day)| {
                let label = str_field(day, &["date", "day"])
                    .map(str::to_owned)
                    .unwrap_or_else(|| format!("Day {}", i + 1));
                let condition = str_field(day, &["condition", "description"]).unwrap_or_default();
                vec![
                    label,
                    format!("{} {condition}", condition_icon(condition)).trim().to_string(),
                    format!(
                        "{}°/{}°",
                        scalar_field(day, &["high"]).unwrap_or_default(),
                        scalar_field(day, &["low"]).unwrap_or_default()
                    ),
                ]
            })
            .collect::<Vec<_>>();
        if !rows.is_empty() {
            children.push(RenderNode::Table {
                headers: vec!["Day".into(), "Condition".into(), "High/Low".into()],
                rows,
            });
        }
    }
    RenderNode::section(children)
}
