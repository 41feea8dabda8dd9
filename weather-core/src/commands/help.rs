use async_trait::async_trait;
use tracing::info;

use super::{CommandContext, CommandHandler};
use crate::reply::Reply;

#[derive(Debug, Default)]
pub struct HelpWeatherCommand;

pub fn help_text(prefix: char) -> String {
    format!(
        "\n**Weather Bot Commands**\n\
         \n\
         `{prefix}weather <city>` - Get current weather information for a specified city\n\
         Example: {prefix}weather London\n\
         \n\
         The weather information includes:\n\
         • Temperature (in Celsius and Fahrenheit)\n\
         • Humidity\n\
         • Wind Speed\n\
         • Atmospheric Pressure\n\
         \n\
         `{prefix}help_weather` - Display this help message\n\
         \n\
         Note: Please provide the city name correctly to get accurate results.\n"
    )
}

#[async_trait]
impl CommandHandler for HelpWeatherCommand {
    fn name(&self) -> &'static str {
        "help_weather"
    }

    async fn handle(&self, ctx: &CommandContext, _arg: Option<&str>) -> anyhow::Result<Reply> {
        info!("help command received");
        Ok(Reply::Text(help_text(ctx.prefix)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn help_lists_command_and_all_reported_fields() {
        let text = help_text('!');
        assert!(text.contains("`!weather <city>`"));
        assert!(text.contains("Example: !weather London"));
        assert!(text.contains("Temperature (in Celsius and Fahrenheit)"));
        assert!(text.contains("Humidity"));
        assert!(text.contains("Wind Speed"));
        assert!(text.contains("Atmospheric Pressure"));
        assert!(text.contains("`!help_weather`"));
    }

    #[test]
    fn help_follows_configured_prefix() {
        let text = help_text('$');
        assert!(text.contains("`$weather <city>`"));
        assert!(!text.contains('!'));
    }
}
