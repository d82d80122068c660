//! 内嵌的单页表单

/// 首页：患者信息与图像上传，结果以 HTML 报告内嵌展示并提供 PDF 下载
pub const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>HemoScope - Blood Cell Analysis</title>
    <style>
        * { box-sizing: border-box; }
        body {
            font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif;
            background: #f1f5f9;
            color: #1e293b;
            margin: 0;
        }
        header {
            background: linear-gradient(135deg, #1e293b 0%, #334155 100%);
            color: white;
            padding: 24px;
            text-align: center;
        }
        main {
            display: grid;
            grid-template-columns: 340px 1fr;
            gap: 24px;
            max-width: 1200px;
            margin: 24px auto;
            padding: 0 16px;
        }
        form, #result {
            background: white;
            border-radius: 8px;
            border: 1px solid #e2e8f0;
            padding: 20px;
        }
        label { display: block; margin-top: 12px; font-weight: 600; font-size: 14px; }
        input, select {
            width: 100%;
            margin-top: 4px;
            padding: 8px;
            border: 1px solid #cbd5e1;
            border-radius: 4px;
        }
        button {
            margin-top: 20px;
            width: 100%;
            padding: 12px;
            background: #3b82f6;
            color: white;
            border: none;
            border-radius: 6px;
            font-size: 16px;
            cursor: pointer;
        }
        button:disabled { background: #94a3b8; cursor: wait; }
        #preview { margin-top: 12px; max-width: 100%; border-radius: 4px; }
        #status { margin-top: 12px; font-size: 14px; color: #64748b; }
        .error { color: #b91c1c !important; }
        #download { display: none; margin-bottom: 12px; }
    </style>
</head>
<body>
    <header>
        <h1>HemoScope</h1>
        <p>AI-assisted blood cell screening. Research and educational use only.</p>
    </header>
    <main>
        <form id="analyze-form">
            <label for="name">Patient name *</label>
            <input id="name" name="name" required>

            <label for="dob">Date of birth</label>
            <input id="dob" name="dob" type="date">

            <label for="gender">Gender</label>
            <select id="gender" name="gender">
                <option value="">Not specified</option>
                <option>Male</option>
                <option>Female</option>
                <option>Other</option>
            </select>

            <label for="context">Clinical context</label>
            <input id="context" name="context" placeholder="Optional notes for the advisor">

            <label for="image">Blood cell image *</label>
            <input id="image" name="image" type="file" accept="image/*" required>
            <img id="preview" alt="">

            <button id="submit" type="submit">Analyze</button>
            <div id="status"></div>
        </form>
        <section id="result">
            <a id="download">Download PDF report</a>
            <div id="report"><p>Upload an image to generate a report.</p></div>
        </section>
    </main>
    <script>
        const form = document.getElementById('analyze-form');
        const status = document.getElementById('status');
        const button = document.getElementById('submit');
        const download = document.getElementById('download');

        document.getElementById('image').addEventListener('change', (event) => {
            const file = event.target.files[0];
            if (file) {
                document.getElementById('preview').src = URL.createObjectURL(file);
            }
        });

        form.addEventListener('submit', async (event) => {
            event.preventDefault();
            button.disabled = true;
            status.className = '';
            status.textContent = 'Analyzing...';
            download.style.display = 'none';

            try {
                const response = await fetch('/api/v1/analyze', {
                    method: 'POST',
                    body: new FormData(form),
                });
                const data = await response.json();
                if (!response.ok) {
                    throw new Error(data.message || ('HTTP ' + response.status));
                }

                document.getElementById('report').innerHTML = data.report_html;
                download.href = 'data:application/pdf;base64,' + data.pdf_base64;
                download.download = data.pdf_file_name;
                download.style.display = 'inline-block';

                const steps = data.trace.steps.map(s => s.node + ': ' + s.status).join(' / ');
                status.textContent = 'Done. ' + steps;
            } catch (err) {
                status.className = 'error';
                status.textContent = 'Analysis failed: ' + err.message;
            } finally {
                button.disabled = false;
            }
        });
    </script>
</body>
</html>
"#;
