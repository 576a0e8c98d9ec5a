use langfused::pricing::{get_pricing_table, TokenSide};
use langfused::tokens::{TokenCounter, TokenizerGateway};
use serde_json::json;

/// Example showing how agent turns are measured and priced.
///
/// This shows how to:
/// - Count tokens with a model-specific tokenizer
/// - Count structured values the way spans do
/// - Look up per-million-token prices
/// - Turn token counts into input and output cost
fn main() -> anyhow::Result<()> {
    println!("=== Token Costs Example ===\n");

    // Example 1: Tokenizer for a model
    let tokenizer = TokenizerGateway::for_model("gpt-4o-mini")?;
    let text = "Plan a three day trip to Lisbon with one museum per day.";
    let tokens = tokenizer.encode(text);
    println!("Text: \"{}\"", text);
    println!("Token count: {}", tokens.len());
    println!("Round-trip successful: {}\n", tokenizer.decode(&tokens) == text);

    // Example 2: Structured values are counted as their JSON text
    let counter = TokenCounter::default();
    let structured = json!({"speaker": "planner", "content": "Day one: Gulbenkian"});
    println!("Structured value: {}", structured);
    println!("Token count: {}\n", counter.count(&structured, "gpt-4o-mini")?);

    // Example 3: Prices per million tokens
    let pricing = get_pricing_table();
    println!("=== Prices (USD per million tokens) ===");
    for model in ["gpt-4o-mini", "gpt-4o", "gpt-4-turbo"] {
        if let Some(price) = pricing.price(model) {
            println!("{:<14} input {:>7.3}  output {:>7.3}", model, price.input, price.output);
        }
    }

    // Example 4: Cost of one generation
    let model = "gpt-4o-mini";
    let input = "Summarise the itinerary for the traveller in two sentences.";
    let output = "Day one covers the Gulbenkian. Day two and three explore Belem and Sintra.";

    let input_tokens = counter.count_str(input, model)?;
    let output_tokens = counter.count_str(output, model)?;
    let input_cost = pricing.cost(model, input_tokens, TokenSide::Input)?;
    let output_cost = pricing.cost(model, output_tokens, TokenSide::Output)?;

    println!("\n=== One generation on {} ===", model);
    println!("input:  {:>4} tokens  ${:.8}", input_tokens, input_cost);
    println!("output: {:>4} tokens  ${:.8}", output_tokens, output_cost);
    println!("total:  {:>4} tokens  ${:.8}", input_tokens + output_tokens, input_cost + output_cost);

    // Example 5: Models without a tokenizer or a price are reported, not guessed
    match counter.count_str(input, "llama3.2") {
        Ok(count) => println!("\nllama3.2: {} tokens", count),
        Err(e) => println!("\nllama3.2: {}", e),
    }
    match pricing.cost("gpt-9", 1_000, TokenSide::Input) {
        Ok(cost) => println!("gpt-9: ${:.6}", cost),
        Err(e) => println!("gpt-9: {}", e),
    }

    println!("\nToken costs example completed!");
    Ok(())
}
