use diagnosis_domain::{NewMessage, Stage};
use diagnosis_workflow::{BlockServiceFactory, GetBlocksRequest, PostMessageRequest, UpdateBlockRequest};
use std::error::Error;
use std::io::{self, Write};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Menú interactivo para recorrer bloques de diagnóstico sobre el
/// repositorio configurado desde el entorno (`DIAG_DB_URL`).
///
/// Opciones soportadas:
/// 1) Ver bloques de un usuario (getBlocks)
/// 2) Responder al bloque actual (updateBlock)
/// 3) Ver conversación de un bloque
/// 4) Publicar pregunta y respuesta del asistente
/// 5) Salir
fn main() -> Result<(), Box<dyn Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Inicializar servicio (aplica migraciones embebidas si procede)
    let svc = BlockServiceFactory::from_env()?;
    tracing::info!(note_policy = ?svc.config().note_policy, "servicio de bloques listo");

    loop {
        println!("\n== Diagnosis CLI menu ==");
        println!("1) Ver bloques de un usuario");
        println!("2) Responder al bloque actual");
        println!("3) Ver conversación de un bloque");
        println!("4) Publicar pregunta y respuesta del asistente");
        println!("5) Salir");
        print!("Elige una opción: ");
        io::stdout().flush().ok();

        let mut choice = String::new();
        io::stdin().read_line(&mut choice)?;
        match choice.trim() {
            "1" => {
                let Some(user) = prompt_i32("User token: ")? else { continue };
                match svc.get_blocks(&GetBlocksRequest { user_token: user }) {
                    Ok(blocks) => println!("{}", serde_json::to_string_pretty(&blocks)?),
                    Err(e) => eprintln!("Error obteniendo bloques: {}", e),
                }
            }
            "2" => {
                let Some(user) = prompt_i32("User token: ")? else { continue };
                let current = match svc.get_blocks(&GetBlocksRequest { user_token: user }) {
                    Ok(b) => b.current,
                    Err(e) => { eprintln!("Error obteniendo bloque actual: {}", e); continue; }
                };
                let stage = current.diagnosis.current_operation;
                println!("Bloque {} en etapa {}", current.diagnosis.id, stage);
                // el mensaje con validación pendiente es el que se responde
                let message_id = current.messages.iter().rev().find(|m| m.has_validation).map(|m| m.id).unwrap_or(0);
                let hint = match stage {
                    Stage::Validation => "¿Es correcta la respuesta? (Yes/No): ",
                    Stage::Score => "Puntuación de 0 a 1: ",
                    Stage::Note => "Nota adicional (o Skip): ",
                    Stage::Finished => "Bloque terminado, enter para continuar: ",
                };
                let response = prompt(hint)?;
                let req = UpdateBlockRequest { user_token: user,
                                               block_id: current.diagnosis.id,
                                               message_id,
                                               current_block_operation: stage,
                                               response: response.trim().to_string() };
                match svc.update_block(&req) {
                    Ok(()) => println!("Bloque actualizado"),
                    Err(e) if e.is_conflict() => eprintln!("El bloque cambió mientras tanto: {}", e),
                    Err(e) => eprintln!("Error actualizando bloque: {}", e),
                }
            }
            "3" => {
                let Some(user) = prompt_i32("User token: ")? else { continue };
                let Some(block) = prompt_i32("Block id: ")? else { continue };
                match svc.conversation(user, block) {
                    Ok(msgs) => {
                        println!("\n#  | ROLE | FLAGS | TEXT");
                        println!("--------------------------------------------");
                        for m in msgs {
                            let flags = format!("{}{}", if m.has_validation { "V" } else { "-" }, if m.has_skip { "S" } else { "-" });
                            println!("{:<2} | {:<4} | {:<5} | {}", m.order_number, m.role, flags, m.text);
                        }
                    }
                    Err(e) => eprintln!("Error leyendo conversación: {}", e),
                }
            }
            "4" => {
                let Some(user) = prompt_i32("User token: ")? else { continue };
                let Some(block) = prompt_i32("Block id: ")? else { continue };
                let question = prompt("Pregunta: ")?;
                let answer = prompt("Respuesta del asistente: ")?;
                let msgs = [NewMessage::ai(question.trim(), 1), NewMessage::ai(answer.trim(), 2).with_validation()];
                for message in msgs {
                    match svc.post_message(&PostMessageRequest { user_token: user, block_id: block, message }) {
                        Ok(m) => println!("Mensaje {} publicado en posición {}", m.id, m.order_number),
                        Err(e) => { eprintln!("Error publicando mensaje: {}", e); break; }
                    }
                }
            }
            "5" => {
                println!("Saliendo...");
                break;
            }
            other => {
                println!("Opción inválida: {}", other);
            }
        }
    }

    Ok(())
}

fn prompt(msg: &str) -> io::Result<String> {
    print!("{}", msg);
    io::stdout().flush()?;
    let mut s = String::new();
    io::stdin().read_line(&mut s)?;
    Ok(s)
}

fn prompt_i32(msg: &str) -> io::Result<Option<i32>> {
    let s = prompt(msg)?;
    match s.trim().parse() {
        Ok(n) => Ok(Some(n)),
        Err(_) => {
            eprintln!("Número inválido");
            Ok(None)
        }
    }
}
