//! Prompt assembly for the area description and question endpoints.

use bloom_core::{assistant::ChatMessage, view::AreaView};

const SYSTEM: &str = "You are a botanist summarising phenology records. \
Answer only from the data provided. Dates are ISO 8601. \
If the data does not answer the question, say so.";

const DESCRIBE: &str = "Describe this area in one short paragraph: which \
species grow there and when they were last seen blooming.";

/// Flatten an area view into plain text for the model.
pub fn render_area(view: &AreaView) -> String {
  let mut lines = vec![format!(
    "Area {} ({} boundary vertices)",
    view.id,
    view.coordinates.len()
  )];
  lines.extend(
    view
      .coordinates
      .iter()
      .map(|c| format!("  vertex {}: {:.5}, {:.5}", c.order, c.latitude, c.longitude)),
  );

  if view.plants.is_empty() {
    lines.push("No plants are assigned to this area.".into());
  }
  for member in &view.plants {
    let mut line = format!("Plant {}: {}", member.plant.id, member.plant.species);
    if let Some(site) = &member.site {
      line.push_str(&format!(
        " at site {} ({:.5}, {:.5}, {} m)",
        site.id, site.latitude, site.longitude, site.elevation
      ));
    }
    lines.push(line);

    for obs in &member.observations {
      let mut line = format!("  {} phenophase {}", obs.observation_date, obs.phenophase_id);
      if let Some(d) = &obs.description {
        line.push_str(&format!(" ({d})"));
      }
      if obs.is_blooming {
        line.push_str(" blooming");
      }
      lines.push(line);
    }
  }

  let mut out = lines.join("\n");
  out.push('\n');
  out
}

pub fn describe_messages(view: &AreaView) -> Vec<ChatMessage> {
  vec![
    ChatMessage::system(SYSTEM),
    ChatMessage::user(format!("{DESCRIBE}\n\n{}", render_area(view))),
  ]
}

pub fn ask_messages(view: &AreaView, question: &str) -> Vec<ChatMessage> {
  vec![
    ChatMessage::system(SYSTEM),
    ChatMessage::user(format!("{}\nQuestion: {question}", render_area(view))),
  ]
}
