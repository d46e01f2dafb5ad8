// translate.rs — Dry-run translation: print the rule, change nothing.

use bmod_translate::Translator;

pub fn execute(text: &str) -> anyhow::Result<()> {
    let translator = Translator::new()?;
    let translation = translator.translate(text)?;

    println!("# intent: {}", translation.intent);
    println!("# description: {}", translation.description);
    print!("{}", translation.rule.to_yaml()?);
    Ok(())
}
