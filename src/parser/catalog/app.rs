//! App lifecycle on the active simulator.

use super::BUNDLE_ID;
use crate::parser::types::CommandDefinition;

pub fn definitions() -> Vec<CommandDefinition> {
    let launch = format!(
        r"^(?:launch|open|start|run|lanzar|abrir|abre|iniciar)\s+(?:the\s+|la\s+)?(?:app|application|aplicaci[oó]n)\s+(?P<bundleId>{BUNDLE_ID})$"
    );
    let terminate = format!(
        r"^(?:terminate|close|kill|stop|quit|cerrar|terminar)\s+(?:the\s+|la\s+)?(?:app|application|aplicaci[oó]n)\s+(?P<bundleId>{BUNDLE_ID})$"
    );
    let uninstall = format!(
        r"^(?:uninstall|remove|delete|desinstalar)\s+(?:the\s+|la\s+)?(?:app|application|aplicaci[oó]n)\s+(?P<bundleId>{BUNDLE_ID})$"
    );
    let installed = format!(r"^(?:is\s+)?(?:the\s+)?(?:app|application)\s+(?P<bundleId>{BUNDLE_ID})\s+installed\??$");
    let check_installed =
        format!(r"^check\s+(?:if\s+)?(?:app\s+)?(?P<bundleId>{BUNDLE_ID})\s+is\s+installed\??$");

    vec![
        CommandDefinition::new("install app", "Install an .app bundle or .ipa on the simulator")
            .patterns(&[
                r"^(?:install|instalar|instala)\s+(?:the\s+|la\s+)?(?:app|application|aplicaci[oó]n)\s+(?:from\s+|desde\s+)?(?P<appPath>\S+)$",
            ])
            .required(&["appPath"])
            .examples(&["install app /tmp/Demo.app", "instalar aplicación ~/Builds/Demo.ipa"])
            .capture("appPath"),
        CommandDefinition::new("launch app", "Launch an installed app by bundle identifier")
            .patterns(&[launch.as_str()])
            .required(&["bundleId"])
            .examples(&["launch app com.apple.MobileSafari", "abrir aplicación com.apple.Maps"])
            .capture("bundleId"),
        CommandDefinition::new("terminate app", "Terminate a running app")
            .patterns(&[terminate.as_str()])
            .required(&["bundleId"])
            .examples(&["terminate app com.apple.MobileSafari", "cerrar aplicación com.apple.Maps"])
            .capture("bundleId"),
        CommandDefinition::new("uninstall app", "Uninstall an app by bundle identifier")
            .patterns(&[uninstall.as_str()])
            .required(&["bundleId"])
            .examples(&["uninstall app com.example.demo", "desinstalar aplicación com.example.demo"])
            .capture("bundleId"),
        CommandDefinition::new("list apps", "List apps installed on the simulator")
            .patterns(&[
                r"^(?:list|show|get)\s+(?:all\s+)?(?:the\s+)?(?:installed\s+)?(?:apps|applications)$",
                r"^listar\s+(?:las\s+)?aplicaciones$",
            ])
            .examples(&["list apps", "show installed applications", "listar aplicaciones"]),
        CommandDefinition::new("is app installed", "Check whether an app is installed")
            .patterns(&[installed.as_str(), check_installed.as_str()])
            .required(&["bundleId"])
            .examples(&["is app com.example.demo installed?", "check if com.example.demo is installed"])
            .capture("bundleId"),
    ]
}
