use super::{ResponseParser, Warnings};
use crate::mpd::protocol;
use crate::mpd::types::Output;

/// `outputid:` starts a new record.
#[derive(Debug, Default)]
pub struct OutputParser {
  current: Option<Output>,
  outputs: Vec<Output>,
}

impl ResponseParser for OutputParser {
  type Output = Vec<Output>;

  fn field(&mut self, key: &str, value: &str, warnings: &mut Warnings) {
    match key {
      protocol::OUTPUT_ID => {
        if let Some(output) = self.current.take() {
          self.outputs.push(output);
        }
        match warnings.number(key, value) {
          Some(id) => {
            self.current = Some(Output {
              id,
              ..Default::default()
            })
          }
          None => self.current = None,
        }
      }
      protocol::OUTPUT_NAME => {
        if let Some(output) = self.current.as_mut() {
          output.name = value.to_string();
        }
      }
      protocol::OUTPUT_ENABLED => {
        if let Some(output) = self.current.as_mut() {
          output.enabled = value == "1";
        }
      }
      _ => {}
    }
  }

  fn finish(mut self, _warnings: &mut Warnings) -> Self::Output {
    if let Some(output) = self.current.take() {
      self.outputs.push(output);
    }
    self.outputs
  }
}

#[cfg(test)]
mod tests {
  use super::super::feed;
  use super::*;

  #[test]
  fn test_outputs() {
    let (outputs, _) = feed(
      OutputParser::default(),
      &[
        "outputid: 0",
        "outputname: ALSA",
        "plugin: alsa",
        "outputenabled: 1",
        "outputid: 1",
        "outputname: Stream",
        "outputenabled: 0",
        "OK",
      ],
    );
    assert_eq!(
      outputs,
      [
        Output {
          id: 0,
          name: "ALSA".into(),
          enabled: true
        },
        Output {
          id: 1,
          name: "Stream".into(),
          enabled: false
        },
      ]
    );
  }

  #[test]
  fn test_output_with_bad_id_is_dropped() {
    let (outputs, warnings) = feed(
      OutputParser::default(),
      &["outputid: x", "outputname: Lost", "outputid: 2", "OK"],
    );
    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs[0].id, 2);
    assert_eq!(warnings.len(), 1);
  }
}
